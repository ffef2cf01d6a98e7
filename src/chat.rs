//! Chat-completion backends.
//!
//! The pipeline only needs "send these messages, get the assistant text
//! back"; `ChatBackend` is that seam. `OpenAiChat` talks to any
//! OpenAI-compatible `/v1/chat/completions` endpoint.

use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    /// Ask the server for `response_format: json_object`.
    pub json_mode: bool,
}

pub trait ChatBackend {
    fn name(&self) -> &str;
    fn complete(&mut self, req: &ChatRequest) -> anyhow::Result<String>;
}

pub struct OpenAiChat {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize, Default)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    #[serde(default)]
    message: Option<WireMessage>,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChat {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

impl ChatBackend for OpenAiChat {
    fn name(&self) -> &str {
        &self.model
    }

    fn complete(&mut self, req: &ChatRequest) -> anyhow::Result<String> {
        let body = WireRequest {
            model: &self.model,
            messages: &req.messages,
            temperature: req.temperature,
            response_format: req.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };
        let url = self.endpoint();
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .with_context(|| format!("post chat completion: {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            let details = resp.text().unwrap_or_default();
            return Err(anyhow!("OpenAI error (status {status}): {details}"));
        }
        let parsed: WireResponse = resp.json().context("parse chat completion response")?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default())
    }
}


#[cfg(test)]
mod tests {
    use super::{ChatMessage, ResponseFormat, WireRequest, WireResponse};

    #[test]
    fn wire_request_shape() {
        let messages = vec![ChatMessage::system("s"), ChatMessage::user("u")];
        let body = WireRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.2,
            response_format: Some(ResponseFormat { kind: "json_object" }),
        };
        let v = serde_json::to_value(&body).expect("serialize");
        assert_eq!(v["model"], "gpt-4o-mini");
        assert_eq!(v["messages"][1]["role"], "user");
        assert_eq!(v["response_format"]["type"], "json_object");

        let plain = WireRequest {
            response_format: None,
            ..body
        };
        let v = serde_json::to_value(&plain).expect("serialize");
        assert!(v.get("response_format").is_none());
    }

    #[test]
    fn wire_response_tolerates_missing_content() {
        let r: WireResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant"}}]}"#)
                .expect("parse");
        assert!(r.choices[0].message.as_ref().and_then(|m| m.content.clone()).is_none());
        let r: WireResponse = serde_json::from_str("{}").expect("parse empty");
        assert!(r.choices.is_empty());
    }
}

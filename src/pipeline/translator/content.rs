use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::chat::{ChatBackend, ChatMessage};
use crate::portable::{verify_structure_unchanged, Document};
use crate::reply::{cleanup_model_text, extract_json_object, string_at, strings_at};
use crate::spans::{extract, reinject_with, Extraction};

use super::TranslatorPipeline;

const CONTENT_TEMPERATURE: f32 = 0.3;

/// Spanish source fields of a CMS document.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRequest {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub title_es: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub short_es: String,
    #[serde(default)]
    pub body_es: Document,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LocalizedContent {
    pub title: String,
    pub short: String,
    pub body: Document,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ContentResult {
    pub en: LocalizedContent,
    pub pt: LocalizedContent,
}

impl<B: ChatBackend> TranslatorPipeline<B> {
    /// Translate title, short description and rich-text body to en and pt in a
    /// single call. An unparseable reply yields empty fields, not an error.
    pub fn translate_content(&mut self, req: &ContentRequest) -> anyhow::Result<ContentResult> {
        let extraction = extract(&req.body_es);
        self.progress.info(format!(
            "Content: {} body spans from {} blocks",
            extraction.len(),
            req.body_es.len()
        ));

        let payload = json!({
            "title": req.title_es,
            "short": req.short_es,
            "body": extraction.texts,
        });
        let messages = vec![
            ChatMessage::system(self.cfg.prompts.content_system.clone()),
            ChatMessage::user(self.cfg.prompts.content_instruction.clone()),
            ChatMessage::user(payload.to_string()),
        ];
        let raw = self.chat("content", messages, CONTENT_TEMPERATURE, false)?;

        let parsed = match extract_json_object(&cleanup_model_text(&raw)) {
            Ok(v) => v,
            Err(e) => {
                warn!("content reply not parseable, leaving result empty: {e:#}");
                return Ok(ContentResult::default());
            }
        };

        Ok(ContentResult {
            en: self.localize(&parsed, "en", &req.body_es, &extraction),
            pt: self.localize(&parsed, "pt", &req.body_es, &extraction),
        })
    }

    fn localize(
        &self,
        parsed: &Value,
        lang: &str,
        body: &Document,
        extraction: &Extraction,
    ) -> LocalizedContent {
        let texts = strings_at(parsed, &[lang, "body"]);
        if texts.len() != extraction.len() {
            warn!(
                "{lang}: model returned {} body texts for {} spans",
                texts.len(),
                extraction.len()
            );
        }
        let translated = reinject_with(
            body,
            &extraction.positions,
            &texts,
            self.cfg.missing_replacement,
        );
        if let Err(e) = verify_structure_unchanged(body, &translated) {
            warn!("{lang}: {e:#}");
        }
        LocalizedContent {
            title: string_at(parsed, &[lang, "title"]),
            short: string_at(parsed, &[lang, "short"]),
            body: translated,
        }
    }
}

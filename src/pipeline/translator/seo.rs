use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::chat::{ChatBackend, ChatMessage};
use crate::pipeline::prompts::render_template;
use crate::reply::{cleanup_model_text, extract_json_object, labelled_value, string_at};
use crate::textutil::{clamp, MAX_SEO_DESCRIPTION, MAX_SEO_TITLE};

use super::TranslatorPipeline;

const SEO_TEMPERATURE: f32 = 0.2;
const SEO_RETRY_TEMPERATURE: f32 = 0.1;

/// Document types that carry localized SEO fields.
pub const SEO_DOCUMENT_TYPES: [&str; 4] = ["service", "solution", "post", "project"];

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoRequest {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub title_es: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub description_es: String,
}

impl SeoRequest {
    fn is_empty(&self) -> bool {
        self.title_es.is_empty() && self.description_es.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoFields {
    pub title: String,
    pub description: String,
}

impl SeoFields {
    fn is_empty(&self) -> bool {
        self.title.is_empty() && self.description.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoResult {
    pub en: SeoFields,
    pub pt: SeoFields,
}

impl SeoResult {
    fn is_empty(&self) -> bool {
        self.en.is_empty() && self.pt.is_empty()
    }

    fn from_json(v: &Value) -> Self {
        Self {
            en: SeoFields {
                title: clamp(&string_at(v, &["en", "title"]), MAX_SEO_TITLE),
                description: clamp(&string_at(v, &["en", "description"]), MAX_SEO_DESCRIPTION),
            },
            pt: SeoFields {
                title: clamp(&string_at(v, &["pt", "title"]), MAX_SEO_TITLE),
                description: clamp(&string_at(v, &["pt", "description"]), MAX_SEO_DESCRIPTION),
            },
        }
    }

    fn from_labelled_lines(text: &str) -> Self {
        Self {
            en: SeoFields {
                title: clamp(&labelled_value(text, "en title"), MAX_SEO_TITLE),
                description: clamp(&labelled_value(text, "en description"), MAX_SEO_DESCRIPTION),
            },
            pt: SeoFields {
                title: clamp(&labelled_value(text, "pt title"), MAX_SEO_TITLE),
                description: clamp(&labelled_value(text, "pt description"), MAX_SEO_DESCRIPTION),
            },
        }
    }

    /// Take each non-empty field of `other`.
    fn merge_non_empty(&mut self, other: SeoResult) {
        let pairs = [
            (&mut self.en.title, other.en.title),
            (&mut self.en.description, other.en.description),
            (&mut self.pt.title, other.pt.title),
            (&mut self.pt.description, other.pt.description),
        ];
        for (slot, value) in pairs {
            if !value.is_empty() {
                *slot = value;
            }
        }
    }

    fn fill_from_source(&mut self, req: &SeoRequest) {
        for fields in [&mut self.en, &mut self.pt] {
            if fields.title.is_empty() && !req.title_es.is_empty() {
                fields.title = clamp(&req.title_es, MAX_SEO_TITLE);
            }
            if fields.description.is_empty() && !req.description_es.is_empty() {
                fields.description = clamp(&req.description_es, MAX_SEO_DESCRIPTION);
            }
        }
    }
}

impl<B: ChatBackend> TranslatorPipeline<B> {
    /// Translate SEO title/description to en and pt, clamped to 60/155 chars.
    ///
    /// Falls back to labelled lines when the reply is not JSON, retries once
    /// with a terse instruction when nothing usable came back, and finally
    /// copies the Spanish text into any field that is still empty.
    pub fn translate_seo(&mut self, req: &SeoRequest) -> anyhow::Result<SeoResult> {
        let max_title = MAX_SEO_TITLE.to_string();
        let max_description = MAX_SEO_DESCRIPTION.to_string();
        let instruction = render_template(
            &self.cfg.prompts.seo_instruction,
            &[
                ("max_title", &max_title),
                ("max_description", &max_description),
                ("title_es", &req.title_es),
                ("description_es", &req.description_es),
            ],
        );
        let messages = vec![
            ChatMessage::system(self.cfg.prompts.seo_system.clone()),
            ChatMessage::user(instruction),
        ];
        let raw = self.chat("seo", messages, SEO_TEMPERATURE, true)?;
        let content = cleanup_model_text(&raw);
        let mut out = match extract_json_object(&content) {
            Ok(v) => SeoResult::from_json(&v),
            Err(_) => SeoResult::from_labelled_lines(&content),
        };

        if out.is_empty() && !req.is_empty() {
            self.progress.info("SEO: empty translation, retrying once");
            match self.retry_seo(req, &max_title, &max_description) {
                Ok(Some(retry)) => out.merge_non_empty(retry),
                Ok(None) => {}
                Err(e) => warn!("SEO retry failed: {e:#}"),
            }
        }

        out.fill_from_source(req);
        Ok(out)
    }

    fn retry_seo(
        &mut self,
        req: &SeoRequest,
        max_title: &str,
        max_description: &str,
    ) -> anyhow::Result<Option<SeoResult>> {
        let instruction = render_template(
            &self.cfg.prompts.seo_retry_instruction,
            &[("max_title", max_title), ("max_description", max_description)],
        );
        let payload = json!({
            "instruction": instruction,
            "es": {"title": req.title_es, "description": req.description_es},
        });
        let messages = vec![
            ChatMessage::system(self.cfg.prompts.seo_retry_system.clone()),
            ChatMessage::user(payload.to_string()),
        ];
        let raw = self.chat("seo_retry", messages, SEO_RETRY_TEMPERATURE, true)?;
        Ok(extract_json_object(&cleanup_model_text(&raw))
            .ok()
            .map(|v| SeoResult::from_json(&v)))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedString {
    #[serde(default)]
    pub es: Option<String>,
    #[serde(default)]
    pub pt: Option<String>,
    #[serde(default)]
    pub en: Option<String>,
}

impl LocalizedString {
    fn es(&self) -> &str {
        self.es.as_deref().unwrap_or_default()
    }

    fn has(value: &Option<String>) -> bool {
        value.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// The SEO-relevant slice of a CMS document (draft or published).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoDocument {
    #[serde(rename = "_type", default, deserialize_with = "super::null_as_default")]
    pub doc_type: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub seo_title_loc: LocalizedString,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub seo_description_loc: LocalizedString,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub auto_sync_seo: bool,
}

impl SeoDocument {
    /// Spanish source for the publish hook: only when the document opted in
    /// with `autoSyncSeo` and is an SEO document type.
    pub fn publish_sync_source(&self) -> Option<SeoRequest> {
        if !self.auto_sync_seo || !is_seo_document_type(&self.doc_type) {
            return None;
        }
        self.spanish_source()
    }

    /// `None` when the Spanish title and description are both empty.
    pub fn spanish_source(&self) -> Option<SeoRequest> {
        let req = SeoRequest {
            title_es: self.seo_title_loc.es().to_string(),
            description_es: self.seo_description_loc.es().to_string(),
        };
        (!req.is_empty()).then_some(req)
    }
}

pub fn is_seo_document_type(doc_type: &str) -> bool {
    SEO_DOCUMENT_TYPES.contains(&doc_type)
}

/// Field path (`seoTitleLoc.en`) -> value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SeoPatch(pub BTreeMap<String, String>);

impl SeoPatch {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// Updates for localized SEO fields that are still empty; manual edits are
/// never overwritten.
pub fn seo_patch(doc: &SeoDocument, result: &SeoResult) -> SeoPatch {
    let mut set = BTreeMap::new();
    if !is_seo_document_type(&doc.doc_type) {
        return SeoPatch(set);
    }
    let candidates = [
        ("seoTitleLoc.en", &doc.seo_title_loc.en, &result.en.title, MAX_SEO_TITLE),
        ("seoDescriptionLoc.en", &doc.seo_description_loc.en, &result.en.description, MAX_SEO_DESCRIPTION),
        ("seoTitleLoc.pt", &doc.seo_title_loc.pt, &result.pt.title, MAX_SEO_TITLE),
        ("seoDescriptionLoc.pt", &doc.seo_description_loc.pt, &result.pt.description, MAX_SEO_DESCRIPTION),
    ];
    for (key, existing, translated, max) in candidates {
        if !LocalizedString::has(existing) && !translated.is_empty() {
            set.insert(key.to_string(), clamp(translated, max));
        }
    }
    SeoPatch(set)
}

use serde::{Deserialize, Deserializer};

use crate::chat::{ChatBackend, ChatMessage, ChatRequest};
use crate::progress::ConsoleProgress;
use crate::textutil::preview;

use super::trace::TraceWriter;
use super::PipelineConfig;

mod content;
mod seo;

pub use content::{ContentRequest, ContentResult, LocalizedContent};
pub use seo::{
    is_seo_document_type, seo_patch, LocalizedString, SeoDocument, SeoFields, SeoPatch,
    SeoRequest, SeoResult,
};

/// Request fields sent as `null` read as their empty value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

pub struct TranslatorPipeline<B: ChatBackend> {
    cfg: PipelineConfig,
    backend: B,
    progress: ConsoleProgress,
    trace: TraceWriter,
    calls: usize,
}

impl<B: ChatBackend> TranslatorPipeline<B> {
    pub fn new(cfg: PipelineConfig, backend: B, progress: ConsoleProgress) -> Self {
        let trace = TraceWriter::new(cfg.trace_dir.clone(), cfg.trace_prompts).unwrap_or_else(|e| {
            log::warn!("trace disabled: {e:#}");
            TraceWriter::disabled()
        });
        if trace.is_enabled() {
            progress.info(format!("Trace dir: {}", trace.dir().display()));
        }
        Self {
            cfg,
            backend,
            progress,
            trace,
            calls: 0,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// One chat round trip, traced under `stage`.
    fn chat(
        &mut self,
        stage: &str,
        messages: Vec<ChatMessage>,
        temperature: f32,
        json_mode: bool,
    ) -> anyhow::Result<String> {
        self.calls += 1;
        let call_id = self.calls;
        let req = ChatRequest {
            messages,
            temperature,
            json_mode,
        };
        let prompt_dump = req
            .messages
            .iter()
            .map(|m| format!("[{}]\n{}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        let _ = self.trace.write_call_text(call_id, stage, "prompt", &prompt_dump);

        self.progress
            .info(format!("{stage}: request #{call_id} ({})", self.backend.name()));
        let raw = self.backend.complete(&req)?;
        let _ = self.trace.write_call_text(call_id, stage, "reply", &raw);
        self.progress.info(format!(
            "{stage}: reply #{call_id}: {}",
            preview(&raw, self.cfg.log_max_chars)
        ));
        Ok(raw)
    }
}

mod config;
mod prompts;
mod trace;
mod translator;

pub use config::{init_default_config, PipelineConfig};
pub use prompts::{render_template, PromptSet};
pub use translator::{
    is_seo_document_type, seo_patch, ContentRequest, ContentResult, LocalizedContent,
    LocalizedString, SeoDocument, SeoFields, SeoPatch, SeoRequest, SeoResult,
    TranslatorPipeline,
};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};

use crate::chat::OpenAiChat;
use crate::config::{
    find_default_config, load_config, AppConfig, CONFIG_ENV, DEFAULT_CONFIG_FILENAME,
};
use crate::pipeline::prompts::{default_prompt_files, PromptSet, DEFAULT_PROMPTS_DIR};
use crate::spans::MissingReplacement;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub config_path: PathBuf,

    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout: Duration,

    pub trace_dir: PathBuf,
    pub trace_prompts: bool,
    pub log_max_chars: usize,
    pub missing_replacement: MissingReplacement,

    pub rates: HashMap<String, f64>,
    pub prompts: PromptSet,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILENAME),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout: Duration::from_secs(60),
            trace_dir: PathBuf::from("_trace"),
            trace_prompts: false,
            log_max_chars: 240,
            missing_replacement: MissingReplacement::EmptyText,
            rates: HashMap::new(),
            prompts: PromptSet::default(),
        }
    }
}

impl PipelineConfig {
    /// Resolve the config file (`--config`, `LOC_TRANSLATOR_CONFIG`, or an
    /// upward search from `workdir`) and apply CLI overrides on top.
    pub fn from_paths_and_args(
        workdir: &Path,
        config_path: Option<PathBuf>,
        model: Option<String>,
        base_url: Option<String>,
        keep_original: bool,
    ) -> anyhow::Result<Self> {
        let cfg_file = config_path
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .or_else(|| find_default_config(workdir, DEFAULT_CONFIG_FILENAME));

        let mut file_cfg = AppConfig::default();
        if let Some(p) = cfg_file.as_ref() {
            if p.exists() {
                file_cfg = load_config(p)?;
            }
        }
        let cfg_path = cfg_file.unwrap_or_else(|| workdir.join(DEFAULT_CONFIG_FILENAME));

        let mut cfg = Self::from_app_config(&cfg_path, &file_cfg)?;
        if let Some(m) = model.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
            cfg.model = m;
        }
        if let Some(u) = base_url.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
            cfg.base_url = u;
        }
        if keep_original {
            cfg.missing_replacement = MissingReplacement::KeepOriginal;
        }
        Ok(cfg)
    }

    pub fn from_app_config(cfg_path: &Path, file_cfg: &AppConfig) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let cfg_dir = cfg_path.parent().unwrap_or_else(|| Path::new("."));

        let trace_dir = file_cfg
            .pipeline
            .trace_dir
            .clone()
            .unwrap_or_else(|| "_trace".to_string());
        let trace_dir = if Path::new(&trace_dir).is_absolute() {
            PathBuf::from(trace_dir)
        } else {
            cfg_dir.join(trace_dir)
        };

        let prompts = PromptSet::load(cfg_path, file_cfg).context("load prompts")?;

        Ok(Self {
            config_path: cfg_path.to_path_buf(),
            base_url: file_cfg
                .openai
                .base_url
                .clone()
                .unwrap_or(defaults.base_url),
            model: file_cfg.openai.model.clone().unwrap_or(defaults.model),
            api_key_env: file_cfg
                .openai
                .api_key_env
                .clone()
                .unwrap_or(defaults.api_key_env),
            timeout: file_cfg
                .openai
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            trace_dir,
            trace_prompts: file_cfg.pipeline.trace_prompts.unwrap_or(false),
            log_max_chars: file_cfg
                .pipeline
                .log_max_chars
                .unwrap_or(defaults.log_max_chars),
            missing_replacement: MissingReplacement::parse(
                file_cfg.pipeline.missing_replacement.as_deref(),
            ),
            rates: file_cfg.pricing.rates.clone(),
            prompts,
        })
    }

    pub fn api_key(&self) -> anyhow::Result<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| anyhow!("{} not configured", self.api_key_env))
    }

    pub fn open_chat(&self) -> anyhow::Result<OpenAiChat> {
        let key = self.api_key()?;
        OpenAiChat::new(&self.base_url, key, &self.model, self.timeout)
    }
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(DEFAULT_CONFIG_FILENAME);

    let prompts_dir = dir.join(DEFAULT_PROMPTS_DIR);
    std::fs::create_dir_all(&prompts_dir)
        .with_context(|| format!("create prompts dir: {}", prompts_dir.display()))?;

    for (fname, body) in default_prompt_files() {
        let p = prompts_dir.join(fname);
        if p.exists() && !force {
            continue;
        }
        std::fs::write(&p, body).with_context(|| format!("write prompt: {}", p.display()))?;
    }

    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

const DEFAULT_CONFIG_TOML: &str = r#"[openai]
base_url = "https://api.openai.com"
model = "gpt-4o-mini"
# The key itself is never stored here.
api_key_env = "OPENAI_API_KEY"
timeout_secs = 60

[pipeline]
trace_dir = "_trace"
trace_prompts = false
log_max_chars = 240
# "empty_text" clears body spans the model did not return;
# "keep_original" leaves the Spanish text in place instead.
missing_replacement = "empty_text"

[prompts]
content_system = "prompts/content_system.txt"
content_instruction = "prompts/content_instruction.txt"
seo_system = "prompts/seo_system.txt"
seo_instruction = "prompts/seo_instruction.txt"
seo_retry_system = "prompts/seo_retry_system.txt"
seo_retry_instruction = "prompts/seo_retry_instruction.txt"

[pricing.rates]
# USD -> local currency. Missing rates fall back to 1.
ARS = 1000.0
BRL = 5.0
"#;

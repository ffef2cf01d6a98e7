use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILENAME: &str = "loc-translator.toml";
pub const CONFIG_ENV: &str = "LOC_TRANSLATOR_CONFIG";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub openai: OpenAiSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub prompts: PromptsSection,
    #[serde(default)]
    pub pricing: PricingSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct OpenAiSection {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Environment variable holding the API key (default: OPENAI_API_KEY).
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PipelineSection {
    #[serde(default)]
    pub trace_dir: Option<String>,
    #[serde(default)]
    pub trace_prompts: Option<bool>,
    #[serde(default)]
    pub log_max_chars: Option<usize>,

    /// What a body span resolves to when the model returned fewer texts than
    /// were sent: "empty_text" (default) or "keep_original".
    #[serde(default)]
    pub missing_replacement: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PromptsSection {
    #[serde(default)]
    pub content_system: Option<String>,
    #[serde(default)]
    pub content_instruction: Option<String>,
    #[serde(default)]
    pub seo_system: Option<String>,
    #[serde(default)]
    pub seo_instruction: Option<String>,
    #[serde(default)]
    pub seo_retry_system: Option<String>,
    #[serde(default)]
    pub seo_retry_instruction: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PricingSection {
    /// USD -> currency rates keyed by ISO code (ARS, BRL).
    #[serde(default)]
    pub rates: HashMap<String, f64>,
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn find_default_config(workdir: &Path, filename: &str) -> Option<PathBuf> {
    if let Some(p) = find_file_upwards(workdir, filename, 8) {
        return Some(p);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(p) = find_file_upwards(dir, filename, 4) {
                return Some(p);
            }
        }
    }
    None
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    parse_config(&text)
}

pub fn parse_config(text: &str) -> anyhow::Result<AppConfig> {
    toml::from_str(text).context("parse config toml")
}

#[cfg(test)]
mod tests {
    use super::{find_file_upwards, parse_config};

    #[test]
    fn parses_sections() {
        let cfg = parse_config(
            r#"
[openai]
model = "gpt-4o-mini"
timeout_secs = 30

[pipeline]
missing_replacement = "keep_original"

[pricing.rates]
ARS = 1250.5
BRL = 5.4
"#,
        )
        .expect("parse");
        assert_eq!(cfg.openai.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(cfg.openai.timeout_secs, Some(30));
        assert_eq!(
            cfg.pipeline.missing_replacement.as_deref(),
            Some("keep_original")
        );
        assert_eq!(cfg.pricing.rates.get("BRL"), Some(&5.4));
        assert!(cfg.prompts.content_system.is_none());
    }

    #[test]
    fn empty_config_is_default() {
        let cfg = parse_config("").expect("parse empty");
        assert!(cfg.openai.base_url.is_none());
        assert!(cfg.pricing.rates.is_empty());
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(parse_config("[openai\nmodel = 1").is_err());
    }

    #[test]
    fn upward_search_finds_parent_file() {
        let root = std::env::temp_dir().join(format!("loc-translator-cfg-{}", std::process::id()));
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(root.join("marker.toml"), "").expect("write");
        let found = find_file_upwards(&nested, "marker.toml", 4).expect("found");
        assert_eq!(found, root.join("marker.toml"));
        assert!(find_file_upwards(&nested, "absent-marker.toml", 2).is_none());
        let _ = std::fs::remove_dir_all(&root);
    }
}

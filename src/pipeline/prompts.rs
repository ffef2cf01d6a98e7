use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use crate::config::{AppConfig, PromptsSection};

pub const DEFAULT_PROMPTS_DIR: &str = "prompts";

pub const DEFAULT_CONTENT_SYSTEM: &str = "content_system.txt";
pub const DEFAULT_CONTENT_INSTRUCTION: &str = "content_instruction.txt";
pub const DEFAULT_SEO_SYSTEM: &str = "seo_system.txt";
pub const DEFAULT_SEO_INSTRUCTION: &str = "seo_instruction.txt";
pub const DEFAULT_SEO_RETRY_SYSTEM: &str = "seo_retry_system.txt";
pub const DEFAULT_SEO_RETRY_INSTRUCTION: &str = "seo_retry_instruction.txt";

#[derive(Clone, Debug, PartialEq)]
pub struct PromptSet {
    pub content_system: String,
    pub content_instruction: String,
    pub seo_system: String,
    pub seo_instruction: String,
    pub seo_retry_system: String,
    pub seo_retry_instruction: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            content_system: DEFAULT_CONTENT_SYSTEM_TEXT.to_string(),
            content_instruction: DEFAULT_CONTENT_INSTRUCTION_TEXT.to_string(),
            seo_system: DEFAULT_SEO_SYSTEM_TEXT.to_string(),
            seo_instruction: DEFAULT_SEO_INSTRUCTION_TEXT.to_string(),
            seo_retry_system: DEFAULT_SEO_RETRY_SYSTEM_TEXT.to_string(),
            seo_retry_instruction: DEFAULT_SEO_RETRY_INSTRUCTION_TEXT.to_string(),
        }
    }
}

impl PromptSet {
    /// Built-in prompts, replaced by any file the `[prompts]` section names.
    /// Relative paths resolve against the config file's directory.
    pub fn load(config_path: &Path, cfg: &AppConfig) -> anyhow::Result<Self> {
        let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
        let p = &cfg.prompts;
        let mut set = Self::default();
        for key in PROMPT_KEYS {
            if let Some(rel) = configured_path(p, key)? {
                let text = read_prompt(config_dir, key, rel)?;
                *set.slot_mut(key)? = text;
            }
        }
        Ok(set)
    }

    fn slot_mut(&mut self, key: &str) -> anyhow::Result<&mut String> {
        Ok(match key {
            "content_system" => &mut self.content_system,
            "content_instruction" => &mut self.content_instruction,
            "seo_system" => &mut self.seo_system,
            "seo_instruction" => &mut self.seo_instruction,
            "seo_retry_system" => &mut self.seo_retry_system,
            "seo_retry_instruction" => &mut self.seo_retry_instruction,
            other => return Err(anyhow!("unknown prompt key: {other}")),
        })
    }
}

const PROMPT_KEYS: [&str; 6] = [
    "content_system",
    "content_instruction",
    "seo_system",
    "seo_instruction",
    "seo_retry_system",
    "seo_retry_instruction",
];

fn configured_path<'a>(p: &'a PromptsSection, key: &str) -> anyhow::Result<Option<&'a str>> {
    let v = match key {
        "content_system" => &p.content_system,
        "content_instruction" => &p.content_instruction,
        "seo_system" => &p.seo_system,
        "seo_instruction" => &p.seo_instruction,
        "seo_retry_system" => &p.seo_retry_system,
        "seo_retry_instruction" => &p.seo_retry_instruction,
        other => return Err(anyhow!("unknown prompt key: {other}")),
    };
    Ok(v.as_deref().map(str::trim).filter(|s| !s.is_empty()))
}

fn read_prompt(config_dir: &Path, key: &str, rel: &str) -> anyhow::Result<String> {
    let mut p = PathBuf::from(rel);
    if p.is_relative() {
        p = config_dir.join(&p);
    }
    if !p.exists() {
        return Err(anyhow!(
            "prompt file not found for {key}: {} (run: loc-translator --init-config)",
            p.display()
        ));
    }
    std::fs::read_to_string(&p).with_context(|| format!("read prompt: {}", p.display()))
}

pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (k, v) in vars {
        let pat = format!("{{{{{k}}}}}");
        out = out.replace(&pat, v);
    }
    out
}

pub fn default_prompt_files() -> Vec<(&'static str, &'static str)> {
    vec![
        (DEFAULT_CONTENT_SYSTEM, DEFAULT_CONTENT_SYSTEM_TEXT),
        (DEFAULT_CONTENT_INSTRUCTION, DEFAULT_CONTENT_INSTRUCTION_TEXT),
        (DEFAULT_SEO_SYSTEM, DEFAULT_SEO_SYSTEM_TEXT),
        (DEFAULT_SEO_INSTRUCTION, DEFAULT_SEO_INSTRUCTION_TEXT),
        (DEFAULT_SEO_RETRY_SYSTEM, DEFAULT_SEO_RETRY_SYSTEM_TEXT),
        (DEFAULT_SEO_RETRY_INSTRUCTION, DEFAULT_SEO_RETRY_INSTRUCTION_TEXT),
    ]
}

pub const DEFAULT_CONTENT_SYSTEM_TEXT: &str =
    "You are a professional translator for marketing content. Return strict JSON. Do not add commentary.";

pub const DEFAULT_CONTENT_INSTRUCTION_TEXT: &str = "Translate the following Spanish fields to English (en) and Portuguese (pt). If a field is empty, return an empty string. Return JSON of the shape: { en: { title: string, short: string, body: string[] }, pt: { title: string, short: string, body: string[] } }. The body array must have the exact same length and order as the input array.";

pub const DEFAULT_SEO_SYSTEM_TEXT: &str =
    "You are a professional marketing copywriter. Return strict JSON only, no prose.";

pub const DEFAULT_SEO_INSTRUCTION_TEXT: &str = r#"Task: Translate the following Spanish SEO fields to English (en) and Portuguese (pt).
Rules:
- Keep title <= {{max_title}} chars and description <= {{max_description}} chars.
- Use ellipsis only if you must trim.
- Respond ONLY with a JSON object of the shape: { "en": { "title": string, "description": string }, "pt": { "title": string, "description": string } }
- Do not include markdown fences or commentary.
Input:
Title_es: {{title_es}}
Description_es: {{description_es}}"#;

pub const DEFAULT_SEO_RETRY_SYSTEM_TEXT: &str = "Return strict JSON only.";

pub const DEFAULT_SEO_RETRY_INSTRUCTION_TEXT: &str =
    "Translate and truncate if needed (title {{max_title}}, description {{max_description}})";

#[cfg(test)]
mod tests {
    use super::{render_template, PromptSet, DEFAULT_SEO_INSTRUCTION_TEXT};
    use crate::config::parse_config;

    #[test]
    fn renders_all_occurrences() {
        let out = render_template(
            DEFAULT_SEO_INSTRUCTION_TEXT,
            &[
                ("max_title", "60"),
                ("max_description", "155"),
                ("title_es", "Video inmobiliario"),
                ("description_es", ""),
            ],
        );
        assert!(out.contains("Keep title <= 60 chars and description <= 155 chars."));
        assert!(out.contains("Title_es: Video inmobiliario"));
        assert!(!out.contains("{{"));
    }

    #[test]
    fn load_uses_defaults_without_overrides() {
        let cfg = parse_config("").expect("parse");
        let set = PromptSet::load(std::path::Path::new("loc-translator.toml"), &cfg)
            .expect("load");
        assert_eq!(set, PromptSet::default());
    }

    #[test]
    fn load_reads_override_relative_to_config() {
        let dir = std::env::temp_dir().join(format!("loc-translator-prompts-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("prompts")).expect("mkdir");
        std::fs::write(dir.join("prompts/sys.txt"), "Be brief.").expect("write");
        let cfg = parse_config("[prompts]\nseo_system = \"prompts/sys.txt\"\n").expect("parse");
        let set = PromptSet::load(&dir.join("loc-translator.toml"), &cfg).expect("load");
        assert_eq!(set.seo_system, "Be brief.");
        assert_eq!(set.content_system, PromptSet::default().content_system);

        let missing = parse_config("[prompts]\nseo_system = \"prompts/nope.txt\"\n").expect("parse");
        assert!(PromptSet::load(&dir.join("loc-translator.toml"), &missing).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}

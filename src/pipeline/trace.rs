use std::path::{Path, PathBuf};

use anyhow::Context;

/// Dumps prompts and raw model replies for later inspection.
pub struct TraceWriter {
    dir: PathBuf,
    enabled: bool,
}

impl TraceWriter {
    pub fn new(dir: PathBuf, enabled: bool) -> anyhow::Result<Self> {
        if enabled {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("create trace dir: {}", dir.display()))?;
        }
        Ok(Self { dir, enabled })
    }

    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn write_named_text(&self, name: &str, text: &str) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let path = self.dir.join(sanitize_filename(name));
        std::fs::write(&path, text).with_context(|| format!("write trace: {}", path.display()))?;
        Ok(())
    }

    pub fn write_call_text(
        &self,
        call_id: usize,
        stage: &str,
        kind: &str,
        text: &str,
    ) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        self.write_named_text(&format!("call_{call_id:04}.{stage}.{kind}.txt"), text)
    }
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => ch,
        })
        .collect()
}

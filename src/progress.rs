use std::io::{self, Write};
use std::time::Instant;

/// Human-facing status lines on stderr, stamped with elapsed time.
pub struct ConsoleProgress {
    enabled: bool,
    t0: Instant,
}

impl ConsoleProgress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            t0: Instant::now(),
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.line("", msg.as_ref());
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.line("warning: ", msg.as_ref());
    }

    fn line(&self, prefix: &str, msg: &str) {
        if !self.enabled {
            return;
        }
        let ts = fmt_elapsed(self.t0.elapsed().as_secs());
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "[{ts}] {prefix}{msg}");
    }
}

fn fmt_elapsed(seconds: u64) -> String {
    let m = seconds / 60;
    let s = seconds % 60;
    format!("{m:02}:{s:02}")
}

#[cfg(test)]
mod tests {
    use super::fmt_elapsed;

    #[test]
    fn elapsed_format() {
        assert_eq!(fmt_elapsed(0), "00:00");
        assert_eq!(fmt_elapsed(75), "01:15");
        assert_eq!(fmt_elapsed(3725), "62:05");
    }
}

use anyhow::Result;
use std::io::Write;

use super::TranscriptSink;

/// Clear the current terminal line
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Prints transcripts to stdout.
///
/// A partial overwrites the current line; a final ends it.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }

    fn render(text: &str, is_final: bool) -> String {
        if is_final {
            format!("{CLEAR_LINE}{text}\n")
        } else {
            format!("{CLEAR_LINE}{text}")
        }
    }
}

#[async_trait::async_trait]
impl TranscriptSink for ConsoleSink {
    async fn emit(&self, text: &str, is_final: bool) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(Self::render(text, is_final).as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_partial_stays_on_line() {
        let out = ConsoleSink::render("hel", false);
        assert!(out.starts_with('\r'));
        assert!(!out.ends_with('\n'));
    }

    #[test]
    fn test_render_final_ends_line() {
        assert_eq!(ConsoleSink::render("hello", true), "\r\x1b[2Khello\n");
    }
}

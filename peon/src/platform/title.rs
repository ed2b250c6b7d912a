use peon_core::host::TitleWriter;
use std::io::{self, Write};

/// Sets the tab title with an OSC 0 escape sequence on stdout.
#[derive(Debug, Default)]
pub struct TerminalTitle;

impl TitleWriter for TerminalTitle {
    fn set_title(&self, title: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(title_sequence(title).as_bytes())?;
        stdout.flush()
    }
}

fn title_sequence(title: &str) -> String {
    // Control characters would end the sequence early
    let title: String = title.chars().filter(|c| !c.is_control()).collect();
    format!("\x1b]0;{title}\x07")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_sequence() {
        assert_eq!(title_sequence("* api: done"), "\x1b]0;* api: done\x07");
        assert_eq!(title_sequence("a\x07b\nc"), "\x1b]0;abc\x07");
    }
}

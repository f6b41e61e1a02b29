//! Terminal control sequence removal.

use std::sync::LazyLock;

use regex_lite::Regex;

/// CSI sequences: `ESC [`, optional private-mode marker, numeric params, final letter.
static CSI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("CSI pattern is valid"));

/// Strip ANSI colour and cursor sequences from agent output.
pub fn strip_ansi(text: &str) -> String {
    CSI.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_colour_codes() {
        assert_eq!(strip_ansi("\x1b[1;32m$ ls\x1b[0m"), "$ ls");
    }

    #[test]
    fn strips_private_mode_sequences() {
        assert_eq!(strip_ansi("\x1b[?25lworking\x1b[?25h"), "working");
    }

    #[test]
    fn leaves_plain_text_alone() {
        let text = "no escapes here [1;2] ok";
        assert_eq!(strip_ansi(text), text);
    }
}

//! Line classifier — separates tool-call trace lines from assistant text.
//!
//! Rules, in priority order:
//! 1. Status lines (`> <agent> · <model>`) are always [`LineKind::Status`] and
//!    never influence grouping.
//! 2. Lines starting with a tool marker (`$ ` or `⚙ `) are [`LineKind::Tool`].
//! 3. Inside a tool run, any other line stays `Tool` while more markers
//!    follow later in the output. After the last marker, the run closes at the
//!    first non-blank line preceded by a blank line since that marker; that
//!    line and everything after it is `Text`.
//! 4. Everything else is `Text`.
//!
//! Rule 3 is asymmetric: blank lines inside earlier tool runs do
//! not end them, only the final run honours a blank-line gap.

use std::sync::LazyLock;

use regex_lite::Regex;

/// Prefixes that mark the start of a tool invocation.
pub const TOOL_MARKERS: [&str; 2] = ["$ ", "⚙ "];

static STATUS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^> \S+ · ").expect("status pattern is valid"));

static ERROR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(error|fail|exception|errno)").expect("error pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    Tool,
    Status,
    Text,
}

/// A raw line paired with its label. Borrows from the raw output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedLine<'a> {
    /// Position in the raw output
    pub index: usize,
    pub text: &'a str,
    pub kind: LineKind,
}

pub fn is_status_line(line: &str) -> bool {
    STATUS_LINE.is_match(line)
}

pub fn is_tool_marker(line: &str) -> bool {
    !is_status_line(line) && TOOL_MARKERS.iter().any(|m| line.starts_with(m))
}

/// Whether a tool line reports a failure.
pub fn is_error_line(line: &str) -> bool {
    ERROR_LINE.is_match(line)
}

/// Label every line. The result has exactly one entry per input line.
pub fn classify(lines: &[&str]) -> Vec<LineKind> {
    let last_marker = lines.iter().rposition(|l| is_tool_marker(l));

    let mut kinds = Vec::with_capacity(lines.len());
    let mut in_tool = false;
    // A blank line has been seen since the current marker.
    let mut blank_since_marker = false;

    for (i, line) in lines.iter().enumerate() {
        if is_status_line(line) {
            kinds.push(LineKind::Status);
            continue;
        }

        if is_tool_marker(line) {
            in_tool = true;
            blank_since_marker = false;
            kinds.push(LineKind::Tool);
            continue;
        }

        if !in_tool {
            kinds.push(LineKind::Text);
            continue;
        }

        let is_blank = line.trim().is_empty();
        let more_markers_ahead = last_marker.is_some_and(|m| m > i);
        if !more_markers_ahead && blank_since_marker && !is_blank {
            in_tool = false;
            kinds.push(LineKind::Text);
            continue;
        }

        blank_since_marker |= is_blank;
        kinds.push(LineKind::Tool);
    }

    kinds
}

/// Split `raw` on `\n` and classify each line.
pub fn classify_lines(raw: &str) -> Vec<ClassifiedLine<'_>> {
    if raw.is_empty() {
        return vec![];
    }

    let lines: Vec<&str> = raw.split('\n').collect();
    let kinds = classify(&lines);
    lines
        .into_iter()
        .zip(kinds)
        .enumerate()
        .map(|(index, (text, kind))| ClassifiedLine { index, text, kind })
        .collect()
}

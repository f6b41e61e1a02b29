//! Output renderer — turns classified lines into chat-ready markup.
//!
//! Status lines are dropped first, then consecutive lines of the same kind
//! are grouped into [`Block`]s. Two tool renderings are available:
//!
//! - [`RenderStyle::Summary`]: each tool run becomes `🔧 N tool calls, M errors`
//! - [`RenderStyle::Collapsible`]: each tool run becomes an expandable quote
//!
//! Text runs always go through the MarkdownV2 conversion. Rendered fragments
//! are joined with a blank line.

use clawbridge_config::RenderStyle;

use crate::classify::{ClassifiedLine, LineKind, classify_lines, is_error_line, is_tool_marker};
use crate::markdown;

/// Separator between rendered fragments.
pub const FRAGMENT_SEPARATOR: &str = "\n\n";

/// A maximal run of same-kind lines after status removal. Owns its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Tool(Vec<String>),
    Text(Vec<String>),
}

impl Block {
    pub fn lines(&self) -> &[String] {
        match self {
            Block::Tool(lines) | Block::Text(lines) => lines,
        }
    }

    /// The block's lines joined and trimmed.
    pub fn body(&self) -> String {
        self.lines().join("\n").trim().to_string()
    }
}

/// Drop status lines and group the rest into maximal runs.
pub fn group_blocks(lines: &[ClassifiedLine<'_>]) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();

    for line in lines {
        let text = line.text.to_string();
        match (line.kind, blocks.last_mut()) {
            (LineKind::Status, _) => {}
            (LineKind::Tool, Some(Block::Tool(run))) | (LineKind::Text, Some(Block::Text(run))) => {
                run.push(text);
            }
            (LineKind::Tool, _) => blocks.push(Block::Tool(vec![text])),
            (LineKind::Text, _) => blocks.push(Block::Text(vec![text])),
        }
    }

    blocks
}

/// One rendered unit, before it is turned into markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedFragment {
    /// Aggregated counts for a tool run.
    ToolSummary { calls: usize, errors: usize },
    /// The trimmed lines of a tool run, shown verbatim.
    ToolQuote(Vec<String>),
    /// Assistant text, still in source Markdown.
    Text(String),
}

impl RenderedFragment {
    /// MarkdownV2 markup for this fragment.
    pub fn to_markup(&self) -> String {
        match self {
            RenderedFragment::ToolSummary { calls, errors } => {
                format!("🔧 _{}_", markdown::escape(&summary_line(*calls, *errors)))
            }
            RenderedFragment::ToolQuote(lines) => expandable_quote(lines),
            RenderedFragment::Text(text) => markdown::to_markdown_v2(text),
        }
    }
}

/// `N tool call(s)[, M error(s)]`
pub fn summary_line(calls: usize, errors: usize) -> String {
    let mut line = format!("{calls} tool {}", plural(calls, "call", "calls"));
    if errors > 0 {
        line.push_str(&format!(", {errors} {}", plural(errors, "error", "errors")));
    }
    line
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

/// Telegram expandable block quotation: `**>` opens, `>` continues, `||` closes.
fn expandable_quote(lines: &[String]) -> String {
    let last = lines.len().saturating_sub(1);
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let prefix = if i == 0 { "**>" } else { ">" };
            let suffix = if i == last { "||" } else { "" };
            format!("{prefix}{}{suffix}", markdown::escape(line))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders agent output in one of the configured styles.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    style: RenderStyle,
}

impl Renderer {
    pub fn new(style: RenderStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> RenderStyle {
        self.style
    }

    /// Blocks to fragments. Empty blocks are dropped.
    pub fn fragments(&self, blocks: &[Block]) -> Vec<RenderedFragment> {
        blocks
            .iter()
            .filter_map(|block| match block {
                Block::Text(_) => {
                    let body = block.body();
                    (!body.is_empty()).then_some(RenderedFragment::Text(body))
                }
                Block::Tool(lines) => match self.style {
                    RenderStyle::Summary => {
                        let calls = lines.iter().filter(|l| is_tool_marker(l)).count();
                        let errors = lines.iter().filter(|l| is_error_line(l)).count();
                        (calls > 0).then_some(RenderedFragment::ToolSummary { calls, errors })
                    }
                    RenderStyle::Collapsible => {
                        let body = block.body();
                        (!body.is_empty()).then(|| {
                            RenderedFragment::ToolQuote(body.lines().map(str::to_string).collect())
                        })
                    }
                },
            })
            .collect()
    }

    /// Full pass: classify, group, render, join.
    pub fn render(&self, raw: &str) -> String {
        let classified = classify_lines(raw);
        let blocks = group_blocks(&classified);
        self.fragments(&blocks)
            .iter()
            .map(RenderedFragment::to_markup)
            .collect::<Vec<_>>()
            .join(FRAGMENT_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> Renderer {
        Renderer::new(RenderStyle::Summary)
    }

    fn collapsible() -> Renderer {
        Renderer::new(RenderStyle::Collapsible)
    }

    fn blocks(raw: &str) -> Vec<Block> {
        group_blocks(&classify_lines(raw))
    }

    #[test]
    fn empty_output_renders_nothing() {
        assert_eq!(summary().render(""), "");
        assert_eq!(collapsible().render("\n\n"), "");
    }

    #[test]
    fn plain_text_is_converted() {
        assert_eq!(summary().render("Hello there."), "Hello there\\.");
    }

    #[test]
    fn single_tool_run_then_text() {
        let raw = "$ ls\nfile.txt\n\nHello there";
        let frags = summary().fragments(&blocks(raw));
        assert_eq!(
            frags,
            vec![
                RenderedFragment::ToolSummary { calls: 1, errors: 0 },
                RenderedFragment::Text("Hello there".into()),
            ]
        );
        assert_eq!(summary().render(raw), "🔧 _1 tool call_\n\nHello there");
    }

    #[test]
    fn errors_are_counted() {
        let raw = "$ cat missing.txt\nError: file not found\n$ ls\n\nThe file is missing.";
        let frags = summary().fragments(&blocks(raw));
        assert_eq!(frags[0], RenderedFragment::ToolSummary { calls: 2, errors: 1 });
        assert!(summary().render(raw).starts_with("🔧 _2 tool calls, 1 error_"));
    }

    #[test]
    fn summary_pluralization() {
        assert_eq!(summary_line(1, 0), "1 tool call");
        assert_eq!(summary_line(3, 0), "3 tool calls");
        assert_eq!(summary_line(2, 1), "2 tool calls, 1 error");
        assert_eq!(summary_line(1, 4), "1 tool call, 4 errors");
    }

    #[test]
    fn status_lines_never_rendered() {
        let raw = "> build · kimi-k2.5-free\n$ ls\n> build · kimi-k2.5-free\n$ pwd\n\nDone";
        let out = summary().render(raw);
        assert!(!out.contains("kimi"));
        assert_eq!(out, "🔧 _2 tool calls_\n\nDone");
    }

    #[test]
    fn text_runs_split_by_status_merge() {
        let raw = "First part\n> plan · gpt-5\nsecond part";
        assert_eq!(
            blocks(raw),
            vec![Block::Text(vec!["First part".into(), "second part".into()])]
        );
    }

    #[test]
    fn text_between_tool_runs_stays_separate() {
        let raw = "Looking around\n$ ls\n\nmore\n$ pwd\n/work\n\nAll done";
        let frags = summary().fragments(&blocks(raw));
        assert_eq!(
            frags,
            vec![
                RenderedFragment::Text("Looking around".into()),
                RenderedFragment::ToolSummary { calls: 2, errors: 0 },
                RenderedFragment::Text("All done".into()),
            ]
        );
    }

    #[test]
    fn collapsible_quotes_tool_runs() {
        let raw = "$ ls\nfile.txt\n\nHello there";
        assert_eq!(
            collapsible().render(raw),
            "**>$ ls\n>file\\.txt||\n\nHello there"
        );
    }

    #[test]
    fn collapsible_single_line_block() {
        let frags = collapsible().fragments(&blocks("⚙ read a.rs\n\nok"));
        assert_eq!(frags[0], RenderedFragment::ToolQuote(vec!["⚙ read a.rs".into()]));
        assert_eq!(frags[0].to_markup(), "**>⚙ read a\\.rs||");
    }

    #[test]
    fn whitespace_only_text_dropped() {
        let frags = summary().fragments(&[Block::Text(vec!["  ".into(), "".into()])]);
        assert!(frags.is_empty());
    }
}

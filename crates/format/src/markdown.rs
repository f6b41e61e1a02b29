//! Common Markdown to Telegram MarkdownV2.
//!
//! Agents answer in everyday Markdown (fenced code, inline code, bold,
//! italic, links, headings, bullets). MarkdownV2 needs every reserved
//! character outside an entity escaped, a different escape set inside code,
//! and `*` for bold / `_` for italic. Anything that does not parse as an
//! entity is escaped and shown literally.

/// Characters that must be backslash-escaped outside entities.
const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    '\\',
];

/// Escape plain text so it renders literally.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        push_escaped(&mut out, c);
    }
    out
}

/// Escape the body of `code` / `pre` entities.
pub fn escape_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '`' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Drop backslash escapes so markup reads naturally as plain text.
pub fn unescape_markup(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut chars = markup.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_punctuation() {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Escape the URL part of an inline link.
fn escape_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        if c == ')' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn push_escaped(out: &mut String, c: char) {
    if RESERVED.contains(&c) {
        out.push('\\');
    }
    out.push(c);
}

/// Convert Markdown to MarkdownV2.
pub fn to_markdown_v2(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim_start();

        if let Some(info) = trimmed.strip_prefix("```") {
            let close = lines[i + 1..]
                .iter()
                .position(|l| l.trim_start().starts_with("```"))
                .map(|p| i + 1 + p);
            let end = close.unwrap_or(lines.len());
            let body = lines[i + 1..end].join("\n");
            out.push(render_fence(info.trim(), &body));
            i = close.map_or(end, |c| c + 1);
            continue;
        }

        out.push(render_line(line));
        i += 1;
    }

    out.join("\n")
}

fn render_fence(info: &str, body: &str) -> String {
    let lang = if !info.is_empty()
        && info
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_' | '#'))
    {
        info
    } else {
        ""
    };
    format!("```{lang}\n{}\n```", escape_code(body))
}

fn render_line(line: &str) -> String {
    let indent_len = line.len() - line.trim_start().len();
    let (indent, rest) = line.split_at(indent_len);

    if let Some(heading) = heading_text(rest) {
        return format!("*{}*", inline(heading));
    }

    if is_rule(rest) {
        return "──────────".to_string();
    }

    for bullet in ["- ", "* ", "+ "] {
        if let Some(item) = rest.strip_prefix(bullet) {
            return format!("{indent}• {}", inline(item));
        }
    }

    if let Some(quoted) = rest.strip_prefix("> ") {
        return format!(">{}", inline(quoted));
    }

    format!("{indent}{}", inline(rest))
}

fn heading_text(line: &str) -> Option<&str> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if (1..=6).contains(&hashes) {
        line[hashes..]
            .strip_prefix(' ')
            .map(str::trim)
            .filter(|h| !h.is_empty())
    } else {
        None
    }
}

fn is_rule(line: &str) -> bool {
    let line = line.trim_end();
    line.len() >= 3 && ['-', '*', '_'].iter().any(|&c| line.chars().all(|ch| ch == c))
}

/// Render inline spans of a single line.
fn inline(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    inline_chars(&chars)
}

fn inline_chars(chars: &[char]) -> String {
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        let span = code_span(chars, i)
            .or_else(|| strong_span(chars, i))
            .or_else(|| emphasis_span(chars, i))
            .or_else(|| strike_span(chars, i))
            .or_else(|| link_span(chars, i));

        match span {
            Some((rendered, next)) => {
                out.push_str(&rendered);
                i = next;
            }
            None => {
                push_escaped(&mut out, chars[i]);
                i += 1;
            }
        }
    }

    out
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}

fn is_word(c: Option<&char>) -> bool {
    c.is_some_and(|c| c.is_alphanumeric())
}

/// `code`
fn code_span(chars: &[char], i: usize) -> Option<(String, usize)> {
    if chars[i] != '`' {
        return None;
    }
    let end = (i + 1..chars.len()).find(|&j| chars[j] == '`')?;
    if end == i + 1 {
        return None;
    }
    let body = escape_code(&collect(&chars[i + 1..end]));
    Some((format!("`{body}`"), end + 1))
}

/// **bold** or __bold__
fn strong_span(chars: &[char], i: usize) -> Option<(String, usize)> {
    let d = chars[i];
    if !matches!(d, '*' | '_') || chars.get(i + 1) != Some(&d) {
        return None;
    }
    if d == '_' && i > 0 && is_word(chars.get(i - 1)) {
        return None;
    }
    let end = (i + 3..chars.len().saturating_sub(1))
        .find(|&j| chars[j] == d && chars[j + 1] == d)?;
    let body = inline_chars(&chars[i + 2..end]);
    Some((format!("*{body}*"), end + 2))
}

/// *italic* or _italic_
fn emphasis_span(chars: &[char], i: usize) -> Option<(String, usize)> {
    let d = chars[i];
    if !matches!(d, '*' | '_') {
        return None;
    }
    let next = chars.get(i + 1)?;
    if next.is_whitespace() || *next == d {
        return None;
    }
    if d == '_' && i > 0 && is_word(chars.get(i - 1)) {
        return None;
    }
    let end = (i + 2..chars.len()).find(|&j| {
        chars[j] == d
            && !chars[j - 1].is_whitespace()
            && chars.get(j + 1) != Some(&d)
            && (d != '_' || !is_word(chars.get(j + 1)))
    })?;
    let body = inline_chars(&chars[i + 1..end]);
    Some((format!("_{body}_"), end + 1))
}

/// ~~strike~~
fn strike_span(chars: &[char], i: usize) -> Option<(String, usize)> {
    if chars[i] != '~' || chars.get(i + 1) != Some(&'~') {
        return None;
    }
    let end = (i + 3..chars.len().saturating_sub(1))
        .find(|&j| chars[j] == '~' && chars[j + 1] == '~')?;
    let body = inline_chars(&chars[i + 2..end]);
    Some((format!("~{body}~"), end + 2))
}

/// [label](url)
fn link_span(chars: &[char], i: usize) -> Option<(String, usize)> {
    if chars[i] != '[' {
        return None;
    }
    let label_end = (i + 1..chars.len()).find(|&j| chars[j] == ']' || chars[j] == '[')?;
    if chars[label_end] != ']' || label_end == i + 1 || chars.get(label_end + 1) != Some(&'(') {
        return None;
    }
    let url_start = label_end + 2;
    let url_end = (url_start..chars.len()).find(|&j| chars[j] == ')')?;
    if url_end == url_start {
        return None;
    }
    let label = inline_chars(&chars[i + 1..label_end]);
    let url = escape_url(&collect(&chars[url_start..url_end]));
    Some((format!("[{label}]({url})"), url_end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_escapes_reserved() {
        assert_eq!(escape("Done. (2 files!)"), "Done\\. \\(2 files\\!\\)");
        assert_eq!(to_markdown_v2("v1.2-beta"), "v1\\.2\\-beta");
    }

    #[test]
    fn bold_and_italic() {
        assert_eq!(to_markdown_v2("**bold** and *italic*"), "*bold* and _italic_");
        assert_eq!(to_markdown_v2("__strong__ _em_"), "*strong* _em_");
    }

    #[test]
    fn snake_case_is_not_italic() {
        assert_eq!(to_markdown_v2("see my_file_name.rs"), "see my\\_file\\_name\\.rs");
    }

    #[test]
    fn lone_asterisks_are_literal() {
        assert_eq!(to_markdown_v2("2 * 3 * 4"), "2 \\* 3 \\* 4");
    }

    #[test]
    fn inline_code_uses_code_escaping() {
        assert_eq!(to_markdown_v2("run `cargo test -p a.b`"), "run `cargo test -p a.b`");
        assert_eq!(to_markdown_v2("unclosed `tick"), "unclosed \\`tick");
    }

    #[test]
    fn fenced_code_block() {
        let input = "text\n```rust\nfn main() { println!(\"hi\"); }\n```\nmore.";
        assert_eq!(
            to_markdown_v2(input),
            "text\n```rust\nfn main() { println!(\"hi\"); }\n```\nmore\\."
        );
    }

    #[test]
    fn unclosed_fence_runs_to_end() {
        assert_eq!(to_markdown_v2("```\na\\b"), "```\na\\\\b\n```");
    }

    #[test]
    fn headings_become_bold() {
        assert_eq!(to_markdown_v2("## Results"), "*Results*");
        assert_eq!(to_markdown_v2("#hashtag"), "\\#hashtag");
    }

    #[test]
    fn bullets_and_quotes() {
        assert_eq!(to_markdown_v2("- one\n  * two"), "• one\n  • two");
        assert_eq!(to_markdown_v2("> quoted"), ">quoted");
    }

    #[test]
    fn links_escape_url() {
        assert_eq!(
            to_markdown_v2("[The Matrix](https://example.com/a_(b))"),
            "[The Matrix](https://example.com/a_(b)\\)"
        );
    }

    #[test]
    fn horizontal_rule() {
        assert_eq!(to_markdown_v2("---"), "──────────");
    }

    #[test]
    fn strikethrough() {
        assert_eq!(to_markdown_v2("~~old~~ new"), "~old~ new");
    }

    #[test]
    fn unescape_restores_plain_text() {
        assert_eq!(unescape_markup("Done\\. \\(2 files\\)"), "Done. (2 files)");
        assert_eq!(unescape_markup("🔧 _1 tool call_"), "🔧 _1 tool call_");
        assert_eq!(unescape_markup("a\\\\b"), "a\\b");
        assert_eq!(unescape_markup("trailing\\"), "trailing\\");
        assert_eq!(unescape_markup(&escape("v1.2 (beta)!")), "v1.2 (beta)!");
    }
}

//! Message chunker — fits arbitrarily long text into the transport's
//! per-message limit.
//!
//! Lengths are counted in characters, not bytes, and cuts always land on a
//! character boundary. A cut prefers the last line break inside the window,
//! unless that would leave a chunk shorter than half the limit; then the
//! text is cut hard at the limit. Leading line breaks of the remainder are
//! dropped after every cut.

/// How a chunk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Cut at a line break, which was removed from the remainder.
    Line,
    /// Cut exactly at the limit.
    Hard,
    /// Last chunk of the text.
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub boundary: Boundary,
}

/// Split `text` into chunks of at most `max_len` characters.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    split_chunks(text, max_len)
        .into_iter()
        .map(|c| c.text)
        .collect()
}

/// Like [`split_message`], but reports where each cut happened.
pub fn split_chunks(text: &str, max_len: usize) -> Vec<Chunk> {
    let max_len = max_len.max(1);

    if text.chars().count() <= max_len {
        return vec![Chunk {
            text: text.to_string(),
            boundary: Boundary::End,
        }];
    }

    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        // Byte offset just past the first `max_len` chars; `None` means it all fits.
        let Some(limit) = rest.char_indices().nth(max_len).map(|(i, _)| i) else {
            chunks.push(Chunk {
                text: rest.to_string(),
                boundary: Boundary::End,
            });
            break;
        };

        let window = &rest[..limit];
        let line_cut = window
            .rfind('\n')
            .filter(|&pos| pos > 0 && window[..pos].chars().count() >= max_len / 2);

        let (cut, boundary) = match line_cut {
            Some(pos) => (pos, Boundary::Line),
            None => (limit, Boundary::Hard),
        };

        chunks.push(Chunk {
            text: rest[..cut].to_string(),
            boundary,
        });
        rest = rest[cut..].trim_start_matches('\n');
    }

    chunks
}

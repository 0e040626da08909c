//! Line-preserving text chunker for size-limited remote content.
//!
//! The remote store caps three things at once: the length of one rich-text
//! segment, the number of segments inside a block, and the number of blocks in
//! one append request. This module handles all three:
//!
//! 1. [`split_text`] cuts text into segments of at most `max_len` characters,
//!    preferring to cut right after a line break (or, with
//!    [`BreakStyle::LineOrSpace`], after a line break or a space).
//! 2. [`pack`] groups consecutive segments into blocks of at most `per_block` items.
//! 3. [`batches`] groups consecutive blocks into requests of at most `per_request` blocks.
//!
//! Lengths are counted in UTF-16 code units, the unit the remote store measures
//! text in, while cuts only ever fall between `char`s. A character outside the
//! Basic Multilingual Plane (most emoji) therefore counts as two.
//!
//! # Example
//!
//! ```rust
//! use repo2notion_core::chunk::{split_text, BreakStyle};
//!
//! let segments = split_text("one\ntwo\nthree\n", 9, BreakStyle::Line);
//! assert_eq!(segments, vec!["one\ntwo\n", "three\n"]);
//! assert_eq!(segments.concat(), "one\ntwo\nthree\n");
//! ```

/// Which characters count as a preferred cut point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BreakStyle {
    /// Cut after `\n` only.
    #[default]
    Line,
    /// Cut after `\n` or a space.
    LineOrSpace,
}

impl BreakStyle {
    fn is_break(self, c: char) -> bool {
        match self {
            BreakStyle::Line => c == '\n',
            BreakStyle::LineOrSpace => c == '\n' || c == ' ',
        }
    }
}

/// Split `text` into ordered segments of at most `max_len` UTF-16 code units.
///
/// When a window ends strictly inside the text, the cut moves back to just after
/// the last break character that lies strictly after the window start; the break
/// stays with the left segment. With no such break the window is hard-cut on the
/// last whole `char` that fits. Because the search never looks past the window,
/// no segment exceeds `max_len`, except a lone character wider than `max_len`
/// itself (only possible when `max_len` is 1).
///
/// Concatenating the result reproduces `text` exactly. A `max_len` of zero is treated as one.
pub fn split_text(text: &str, max_len: usize, style: BreakStyle) -> Vec<String> {
    let max_len = max_len.max(1);
    let chars: Vec<char> = text.chars().collect();
    let mut segments = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = start;
        let mut units = 0;
        while end < chars.len() && units + chars[end].len_utf16() <= max_len {
            units += chars[end].len_utf16();
            end += 1;
        }
        if end == start {
            end = start + 1;
        }
        if end < chars.len() {
            if let Some(cut) = (start + 1..end).rev().find(|&i| style.is_break(chars[i])) {
                end = cut + 1;
            }
        }
        segments.push(chars[start..end].iter().collect());
        start = end;
    }

    segments
}

/// Length of `text` as the remote store counts it.
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Group consecutive segments into blocks of at most `per_block` items.
pub fn pack(segments: Vec<String>, per_block: usize) -> Vec<Vec<String>> {
    let per_block = per_block.max(1);
    let mut blocks = Vec::with_capacity(segments.len().div_ceil(per_block));
    let mut current = Vec::with_capacity(per_block.min(segments.len()));
    for segment in segments {
        current.push(segment);
        if current.len() == per_block {
            blocks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Consecutive slices of at most `per_request` items, in order.
pub fn batches<T>(items: &[T], per_request: usize) -> std::slice::Chunks<'_, T> {
    items.chunks(per_request.max(1))
}

/// Remove control characters the remote store rejects, keeping `\n`, `\r` and `\t`.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|&c| {
            !matches!(c,
                '\u{0}'..='\u{8}'
                | '\u{b}'
                | '\u{c}'
                | '\u{e}'..='\u{1f}'
                | '\u{7f}'..='\u{9f}')
        })
        .collect()
}


/// One bounded-length piece of an uploaded document, ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The chunk text
    pub content: String,
    /// The index of this chunk within the document
    pub chunk_index: usize,
    /// Length of the chunk in characters
    pub char_count: usize,
}

/// Split text into contiguous chunks of at most `chunk_size` characters.
///
/// Boundaries prefer the last whitespace inside the window so words stay
/// intact where possible; a window without whitespace is split hard at
/// `chunk_size`. Whitespace is kept at the end of the chunk it follows, so
/// concatenating the chunks reconstructs the input exactly. Identical input
/// and chunk size always produce identical output.
#[inline]
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<TextChunk> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut char_count = 0;

    for ch in text.chars() {
        current.push(ch);
        char_count += 1;

        if char_count == chunk_size {
            let (emitted, emitted_chars) = match last_break(&current) {
                // Break after the last whitespace, unless the window already
                // ends on one (then the whole window is the chunk)
                Some((byte_pos, chars_to_break)) if byte_pos < current.len() => {
                    let rest = current.split_off(byte_pos);
                    let head = std::mem::replace(&mut current, rest);
                    (head, chars_to_break)
                }
                _ => (std::mem::take(&mut current), char_count),
            };

            char_count -= emitted_chars;
            chunks.push(TextChunk {
                content: emitted,
                chunk_index: chunks.len(),
                char_count: emitted_chars,
            });
        }
    }

    if !current.is_empty() {
        chunks.push(TextChunk {
            content: current,
            chunk_index: chunks.len(),
            char_count,
        });
    }

    chunks
}

/// Find the split point after the last whitespace character: byte position
/// just past it and the number of characters up to and including it
fn last_break(window: &str) -> Option<(usize, usize)> {
    let mut found = None;
    let mut chars_seen = 0;

    for (byte_idx, ch) in window.char_indices() {
        chars_seen += 1;
        if ch.is_whitespace() {
            found = Some((byte_idx + ch.len_utf8(), chars_seen));
        }
    }

    found
}

//! Chunk planning for progressive response delivery.
//!
//! A body is split into successive spans of `chunk_size` characters; the last
//! span may be shorter. Span boundaries are char boundaries so multi-byte text
//! never splits mid-character. With no chunk size the whole body is a single
//! span, even when empty.

/// Byte end-offsets of each chunk of `body`.
///
/// `chunk_size` counts characters; `None` or zero means a single whole-body
/// chunk. An empty body with an explicit chunk size yields no chunks at all.
pub(crate) fn chunk_ends(body: &str, chunk_size: Option<usize>) -> Vec<usize> {
    let Some(size) = chunk_size.filter(|&size| size > 0) else {
        return vec![body.len()];
    };

    let mut ends = Vec::new();
    let mut in_chunk = 0;
    for (index, ch) in body.char_indices() {
        in_chunk += 1;
        if in_chunk == size {
            ends.push(index + ch.len_utf8());
            in_chunk = 0;
        }
    }
    if in_chunk > 0 {
        ends.push(body.len());
    }
    ends
}

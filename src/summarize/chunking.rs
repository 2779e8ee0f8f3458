//! Fixed-window word chunking for inputs that exceed the model window.
//!
//! The chunker is deliberately naive: contiguous runs of `window` words, no
//! overlap, no sentence awareness. Joining all chunks' words in order yields
//! the original word sequence exactly, so nothing is dropped or duplicated.

/// Split a word sequence into chunks of at most `window` words.
///
/// Inputs of `window` words or fewer come back as a single chunk. Longer
/// inputs produce `ceil(len / window)` chunks where only the final chunk may
/// be shorter than `window`.
pub(crate) fn chunk_words(words: &[&str], window: usize) -> Vec<String> {
    words
        .chunks(window.max(1))
        .map(|chunk| chunk.join(" "))
        .collect()
}

/// Divide overall generation bounds evenly across `chunk_count` chunks.
///
/// Every chunk gets the same share regardless of its actual size; this
/// mirrors the even split the rest of the pipeline expects rather than a
/// proportional allocation. Both bounds are floored at 1 so a heavily
/// fragmented input can never ask the generator for an empty summary, and
/// the returned pair always satisfies `min <= max`.
pub(crate) fn per_chunk_bounds(
    min_length: usize,
    max_length: usize,
    chunk_count: usize,
) -> (usize, usize) {
    let count = chunk_count.max(1);
    let chunk_min = (min_length / count).max(1);
    let chunk_max = (max_length / count).max(chunk_min);
    (chunk_min, chunk_max)
}

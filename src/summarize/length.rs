//! Length tiers and the policy mapping them to generation bounds.
//!
//! The tier scales the summary budget with the input: each tier reserves a
//! fraction of the input word count for the generated summary, floored at a
//! hard minimum so tiny inputs still produce a usable summary. Integer
//! arithmetic keeps the bounds exact and platform-independent.

/// Qualitative summary length requested by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LengthTier {
    /// Roughly a tenth to a fifth of the input.
    Short,
    /// Roughly a fifth to two fifths of the input.
    Medium,
    /// Roughly two fifths to three fifths of the input.
    Long,
}

impl LengthTier {
    /// Interpret a request label. Unrecognized labels fall back to [`LengthTier::Long`].
    pub fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "short" => Self::Short,
            "medium" => Self::Medium,
            _ => Self::Long,
        }
    }
}

/// Map a tier and input word count to `(min_length, max_length)` token bounds.
///
/// For every tier and `word_count >= 0` the result satisfies
/// `1 <= min_length <= max_length`, with both values at least the tier's hard
/// floor. There is no upper clamp; very long inputs get their bounds divided
/// per chunk downstream.
pub(crate) fn length_bounds(tier: LengthTier, word_count: usize) -> (usize, usize) {
    match tier {
        LengthTier::Short => ((word_count / 10).max(10), (word_count / 5).max(20)),
        LengthTier::Medium => ((word_count / 5).max(30), (word_count * 2 / 5).max(60)),
        LengthTier::Long => ((word_count * 2 / 5).max(50), (word_count * 3 / 5).max(100)),
    }
}

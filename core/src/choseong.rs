//! Leading-consonant (choseong) projection and search-token normalization.

use crate::jamo;
use crate::syllable;

/// How whitespace in the input is carried into the choseong projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitespacePolicy {
    /// Whitespace passes through untouched (subject to `preserve_non_hangul`).
    Keep,
    /// Internal whitespace runs collapse to a single space; none leading.
    Normalize,
    /// All whitespace is dropped.
    Remove,
}

/// Options controlling the choseong projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoseongOptions {
    /// Emit non-Hangul code points instead of dropping them.
    pub preserve_non_hangul: bool,
    pub whitespace: WhitespacePolicy,
}

impl Default for ChoseongOptions {
    fn default() -> Self {
        Self {
            preserve_non_hangul: true,
            whitespace: WhitespacePolicy::Keep,
        }
    }
}

/// Project a string onto its leading consonants.
///
/// Per code point, in order: a modern syllable contributes its initial jamo,
/// a compatibility consonant passes through, whitespace follows the policy,
/// and anything else is emitted only when `preserve_non_hangul` is set.
pub fn choseong(input: &str, opts: &ChoseongOptions) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_was_whitespace = false;
    for c in input.chars() {
        if let Some((l, _, _)) = syllable::decompose(c) {
            out.push(jamo::CHOSEONG_CHARS[l as usize]);
            prev_was_whitespace = false;
        } else if jamo::is_compat_consonant(c) {
            out.push(c);
            prev_was_whitespace = false;
        } else if c.is_whitespace() {
            match opts.whitespace {
                WhitespacePolicy::Keep => {
                    if opts.preserve_non_hangul {
                        out.push(c);
                    }
                }
                WhitespacePolicy::Normalize => {
                    if !out.is_empty() && !prev_was_whitespace {
                        out.push(' ');
                    }
                }
                WhitespacePolicy::Remove => {}
            }
            prev_was_whitespace = true;
        } else {
            if opts.preserve_non_hangul {
                out.push(c);
            }
            prev_was_whitespace = false;
        }
    }
    out
}

/// Canonical search token: NFC composition followed by lowercasing.
///
/// All matching in the search crates compares these normalized forms.
pub fn normalized_token(input: &str) -> String {
    use unicode_normalization::UnicodeNormalization;
    input.nfc().collect::<String>().to_lowercase()
}

//! Arithmetic codec between precomposed Hangul syllables and (L, V, T) index triples.
//!
//! The modern syllable block [U+AC00, U+D7A3] encodes every syllable as
//! `base + (L * 21 + V) * 28 + T`, so composition and decomposition are pure
//! arithmetic with no table lookup.

/// First code point of the modern Hangul syllable block (가).
pub const SYLLABLE_BASE: u32 = 0xAC00;

/// Last code point of the modern Hangul syllable block (힣).
pub const SYLLABLE_END: u32 = 0xD7A3;

/// Number of initial consonants (choseong).
pub const CHOSEONG_COUNT: u32 = 19;

/// Number of medial vowels (jungseong).
pub const JUNGSEONG_COUNT: u32 = 21;

/// Number of final consonants (jongseong), including "no final" at index 0.
pub const JONGSEONG_COUNT: u32 = 28;

/// Whether a character is a precomposed modern Hangul syllable.
pub fn is_syllable(c: char) -> bool {
    (SYLLABLE_BASE..=SYLLABLE_END).contains(&(c as u32))
}

/// Compose a syllable from (choseong, jungseong, jongseong) indices.
///
/// Returns `None` when any index is outside its declared range.
pub fn compose(choseong: u32, jungseong: u32, jongseong: u32) -> Option<char> {
    if choseong >= CHOSEONG_COUNT || jungseong >= JUNGSEONG_COUNT || jongseong >= JONGSEONG_COUNT {
        return None;
    }
    let code = SYLLABLE_BASE + (choseong * JUNGSEONG_COUNT + jungseong) * JONGSEONG_COUNT + jongseong;
    char::from_u32(code)
}

/// Decompose a precomposed syllable into (choseong, jungseong, jongseong) indices.
///
/// Returns `None` for code points outside the modern syllable block.
pub fn decompose(c: char) -> Option<(u32, u32, u32)> {
    let code = c as u32;
    if !(SYLLABLE_BASE..=SYLLABLE_END).contains(&code) {
        return None;
    }
    let offset = code - SYLLABLE_BASE;
    let jongseong = offset % JONGSEONG_COUNT;
    let jungseong = (offset / JONGSEONG_COUNT) % JUNGSEONG_COUNT;
    let choseong = offset / (JUNGSEONG_COUNT * JONGSEONG_COUNT);
    Some((choseong, jungseong, jongseong))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose() {
        // 가 = ㄱ(0) + ㅏ(0), no final
        assert_eq!(compose(0, 0, 0), Some('가'));
        // 각 = ㄱ(0) + ㅏ(0) + ㄱ(1)
        assert_eq!(compose(0, 0, 1), Some('각'));
        // 한 = ㅎ(18) + ㅏ(0) + ㄴ(4)
        assert_eq!(compose(18, 0, 4), Some('한'));
        // 힣 = last syllable of the block
        assert_eq!(compose(18, 20, 27), Some('힣'));
    }

    #[test]
    fn test_compose_rejects_out_of_range() {
        assert_eq!(compose(19, 0, 0), None);
        assert_eq!(compose(0, 21, 0), None);
        assert_eq!(compose(0, 0, 28), None);
    }

    #[test]
    fn test_decompose() {
        assert_eq!(decompose('가'), Some((0, 0, 0)));
        assert_eq!(decompose('한'), Some((18, 0, 4)));
        assert_eq!(decompose('글'), Some((0, 18, 8)));
        assert_eq!(decompose('a'), None);
        assert_eq!(decompose('ㄱ'), None);
        assert_eq!(decompose('\u{D7A4}'), None);
    }

    #[test]
    fn test_roundtrip_over_whole_block() {
        for code in SYLLABLE_BASE..=SYLLABLE_END {
            let c = char::from_u32(code).unwrap();
            let (l, v, t) = decompose(c).unwrap();
            assert_eq!(compose(l, v, t), Some(c));
        }
    }

    #[test]
    fn test_roundtrip_over_all_triples() {
        for l in 0..CHOSEONG_COUNT {
            for v in 0..JUNGSEONG_COUNT {
                for t in 0..JONGSEONG_COUNT {
                    let c = compose(l, v, t).unwrap();
                    assert_eq!(decompose(c), Some((l, v, t)));
                }
            }
        }
    }
}

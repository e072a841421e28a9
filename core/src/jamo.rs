//! Compatibility jamo tables and compound decomposition.
//!
//! The codec in [`crate::syllable`] works in index space; this module maps
//! those indices to the compatibility jamo block (U+3131..U+3163) and carries
//! the compound-vowel and compound-final pairs used by the composer, the
//! choseong extractor and the jamo edit distance.

use crate::syllable;

/// Initial consonants by choseong index (19 entries).
pub const CHOSEONG_CHARS: [char; 19] = [
    'ㄱ', 'ㄲ', 'ㄴ', 'ㄷ', 'ㄸ', 'ㄹ', 'ㅁ', 'ㅂ', 'ㅃ', 'ㅅ', 'ㅆ', 'ㅇ', 'ㅈ', 'ㅉ', 'ㅊ', 'ㅋ',
    'ㅌ', 'ㅍ', 'ㅎ',
];

/// Medial vowels by jungseong index (21 entries).
pub const JUNGSEONG_CHARS: [char; 21] = [
    'ㅏ', 'ㅐ', 'ㅑ', 'ㅒ', 'ㅓ', 'ㅔ', 'ㅕ', 'ㅖ', 'ㅗ', 'ㅘ', 'ㅙ', 'ㅚ', 'ㅛ', 'ㅜ', 'ㅝ', 'ㅞ',
    'ㅟ', 'ㅠ', 'ㅡ', 'ㅢ', 'ㅣ',
];

/// Final consonants by jongseong index (28 entries, index 0 = no final).
pub const JONGSEONG_CHARS: [Option<char>; 28] = [
    None,
    Some('ㄱ'),
    Some('ㄲ'),
    Some('ㄳ'),
    Some('ㄴ'),
    Some('ㄵ'),
    Some('ㄶ'),
    Some('ㄷ'),
    Some('ㄹ'),
    Some('ㄺ'),
    Some('ㄻ'),
    Some('ㄼ'),
    Some('ㄽ'),
    Some('ㄾ'),
    Some('ㄿ'),
    Some('ㅀ'),
    Some('ㅁ'),
    Some('ㅂ'),
    Some('ㅄ'),
    Some('ㅅ'),
    Some('ㅆ'),
    Some('ㅇ'),
    Some('ㅈ'),
    Some('ㅊ'),
    Some('ㅋ'),
    Some('ㅌ'),
    Some('ㅍ'),
    Some('ㅎ'),
];

/// Whether a character is a compatibility jamo consonant (ㄱ..ㅎ).
pub fn is_compat_consonant(c: char) -> bool {
    ('\u{3131}'..='\u{314E}').contains(&c)
}

/// Whether a character is a compatibility jamo vowel (ㅏ..ㅣ).
pub fn is_compat_vowel(c: char) -> bool {
    ('\u{314F}'..='\u{3163}').contains(&c)
}

/// Compatibility jamo for a choseong index.
pub fn choseong_char(index: u32) -> Option<char> {
    CHOSEONG_CHARS.get(index as usize).copied()
}

/// Compatibility jamo for a jungseong index.
pub fn jungseong_char(index: u32) -> Option<char> {
    JUNGSEONG_CHARS.get(index as usize).copied()
}

/// Compatibility jamo for a jongseong index (`None` for index 0).
pub fn jongseong_char(index: u32) -> Option<char> {
    JONGSEONG_CHARS.get(index as usize).copied().flatten()
}

/// Choseong index for a compatibility consonant usable as an initial.
pub fn choseong_index(c: char) -> Option<u32> {
    CHOSEONG_CHARS.iter().position(|&j| j == c).map(|i| i as u32)
}

/// Jungseong index for a compatibility vowel.
pub fn jungseong_index(c: char) -> Option<u32> {
    JUNGSEONG_CHARS.iter().position(|&j| j == c).map(|i| i as u32)
}

/// Jongseong index for a compatibility consonant usable as a final.
pub fn jongseong_index(c: char) -> Option<u32> {
    JONGSEONG_CHARS
        .iter()
        .position(|&j| j == Some(c))
        .map(|i| i as u32)
}

/// Combine two jungseong indices into a compound vowel index.
///
/// The declared pairs are ㅘ ㅙ ㅚ ㅝ ㅞ ㅟ ㅢ; everything else is `None`.
pub fn combine_jungseong(first: u32, second: u32) -> Option<u32> {
    match (first, second) {
        (8, 0) => Some(9),    // ㅗ + ㅏ = ㅘ
        (8, 1) => Some(10),   // ㅗ + ㅐ = ㅙ
        (8, 20) => Some(11),  // ㅗ + ㅣ = ㅚ
        (13, 4) => Some(14),  // ㅜ + ㅓ = ㅝ
        (13, 5) => Some(15),  // ㅜ + ㅔ = ㅞ
        (13, 20) => Some(16), // ㅜ + ㅣ = ㅟ
        (18, 20) => Some(19), // ㅡ + ㅣ = ㅢ
        _ => None,
    }
}

/// Combine two jongseong indices into a compound final index.
pub fn combine_jongseong(first: u32, second: u32) -> Option<u32> {
    match (first, second) {
        (1, 19) => Some(3),   // ㄱ + ㅅ = ㄳ
        (4, 22) => Some(5),   // ㄴ + ㅈ = ㄵ
        (4, 27) => Some(6),   // ㄴ + ㅎ = ㄶ
        (8, 1) => Some(9),    // ㄹ + ㄱ = ㄺ
        (8, 16) => Some(10),  // ㄹ + ㅁ = ㄻ
        (8, 17) => Some(11),  // ㄹ + ㅂ = ㄼ
        (8, 19) => Some(12),  // ㄹ + ㅅ = ㄽ
        (8, 25) => Some(13),  // ㄹ + ㅌ = ㄾ
        (8, 26) => Some(14),  // ㄹ + ㅍ = ㄿ
        (8, 27) => Some(15),  // ㄹ + ㅎ = ㅀ
        (17, 19) => Some(18), // ㅂ + ㅅ = ㅄ
        _ => None,
    }
}

/// Split a compound final into (remaining jongseong index, next choseong index).
///
/// The second component becomes the initial of the following syllable when a
/// vowel follows. Single finals return `None`.
pub fn split_jongseong(jong: u32) -> Option<(u32, u32)> {
    match jong {
        3 => Some((1, 9)),   // ㄳ -> ㄱ + ㅅ
        5 => Some((4, 12)),  // ㄵ -> ㄴ + ㅈ
        6 => Some((4, 18)),  // ㄶ -> ㄴ + ㅎ
        9 => Some((8, 0)),   // ㄺ -> ㄹ + ㄱ
        10 => Some((8, 6)),  // ㄻ -> ㄹ + ㅁ
        11 => Some((8, 7)),  // ㄼ -> ㄹ + ㅂ
        12 => Some((8, 9)),  // ㄽ -> ㄹ + ㅅ
        13 => Some((8, 16)), // ㄾ -> ㄹ + ㅌ
        14 => Some((8, 17)), // ㄿ -> ㄹ + ㅍ
        15 => Some((8, 18)), // ㅀ -> ㄹ + ㅎ
        18 => Some((17, 9)), // ㅄ -> ㅂ + ㅅ
        _ => None,
    }
}

/// Choseong index a single final moves to when carried into the next syllable.
pub fn jongseong_to_choseong(jong: u32) -> Option<u32> {
    match jong {
        1 => Some(0),   // ㄱ
        2 => Some(1),   // ㄲ
        4 => Some(2),   // ㄴ
        7 => Some(3),   // ㄷ
        8 => Some(5),   // ㄹ
        16 => Some(6),  // ㅁ
        17 => Some(7),  // ㅂ
        19 => Some(9),  // ㅅ
        20 => Some(10), // ㅆ
        21 => Some(11), // ㅇ
        22 => Some(12), // ㅈ
        23 => Some(14), // ㅊ
        24 => Some(15), // ㅋ
        25 => Some(16), // ㅌ
        26 => Some(17), // ㅍ
        27 => Some(18), // ㅎ
        _ => None,
    }
}

/// Decompose a compound vowel into its two component vowels.
pub fn decompose_compound_vowel(c: char) -> Option<(char, char)> {
    match c {
        'ㅘ' => Some(('ㅗ', 'ㅏ')),
        'ㅙ' => Some(('ㅗ', 'ㅐ')),
        'ㅚ' => Some(('ㅗ', 'ㅣ')),
        'ㅝ' => Some(('ㅜ', 'ㅓ')),
        'ㅞ' => Some(('ㅜ', 'ㅔ')),
        'ㅟ' => Some(('ㅜ', 'ㅣ')),
        'ㅢ' => Some(('ㅡ', 'ㅣ')),
        _ => None,
    }
}

/// Decompose a compound final into its two component consonants.
pub fn decompose_compound_final(c: char) -> Option<(char, char)> {
    match c {
        'ㄳ' => Some(('ㄱ', 'ㅅ')),
        'ㄵ' => Some(('ㄴ', 'ㅈ')),
        'ㄶ' => Some(('ㄴ', 'ㅎ')),
        'ㄺ' => Some(('ㄹ', 'ㄱ')),
        'ㄻ' => Some(('ㄹ', 'ㅁ')),
        'ㄼ' => Some(('ㄹ', 'ㅂ')),
        'ㄽ' => Some(('ㄹ', 'ㅅ')),
        'ㄾ' => Some(('ㄹ', 'ㅌ')),
        'ㄿ' => Some(('ㄹ', 'ㅍ')),
        'ㅀ' => Some(('ㄹ', 'ㅎ')),
        'ㅄ' => Some(('ㅂ', 'ㅅ')),
        _ => None,
    }
}

/// Flatten a string into a jamo stream for jamo-level edit distance.
///
/// Syllables split into L/V/T compatibility jamo; compound vowels and finals
/// split further into their two components; standalone compatibility jamo are
/// split the same way. Non-Hangul code points are discarded.
pub fn decompose_to_jamo_stream(input: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(input.chars().count() * 2);
    for c in input.chars() {
        if let Some((l, v, t)) = syllable::decompose(c) {
            out.push(CHOSEONG_CHARS[l as usize]);
            push_vowel_split(&mut out, JUNGSEONG_CHARS[v as usize]);
            if let Some(f) = jongseong_char(t) {
                push_final_split(&mut out, f);
            }
        } else if is_compat_vowel(c) {
            push_vowel_split(&mut out, c);
        } else if is_compat_consonant(c) {
            push_final_split(&mut out, c);
        }
    }
    out
}

fn push_vowel_split(out: &mut Vec<char>, v: char) {
    if let Some((a, b)) = decompose_compound_vowel(v) {
        out.push(a);
        out.push(b);
    } else {
        out.push(v);
    }
}

fn push_final_split(out: &mut Vec<char>, f: char) {
    if let Some((a, b)) = decompose_compound_final(f) {
        out.push(a);
        out.push(b);
    } else {
        out.push(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_char_tables_are_aligned() {
        assert_eq!(choseong_char(0), Some('ㄱ'));
        assert_eq!(choseong_char(18), Some('ㅎ'));
        assert_eq!(choseong_char(19), None);
        assert_eq!(jungseong_char(9), Some('ㅘ'));
        assert_eq!(jongseong_char(0), None);
        assert_eq!(jongseong_char(3), Some('ㄳ'));
        for (i, &c) in CHOSEONG_CHARS.iter().enumerate() {
            assert_eq!(choseong_index(c), Some(i as u32));
        }
        for (i, &c) in JUNGSEONG_CHARS.iter().enumerate() {
            assert_eq!(jungseong_index(c), Some(i as u32));
        }
    }

    #[test]
    fn test_compound_composition_is_bijective() {
        // Every declared vowel pair splits back to its components.
        for v in JUNGSEONG_CHARS {
            if let Some((a, b)) = decompose_compound_vowel(v) {
                let first = jungseong_index(a).unwrap();
                let second = jungseong_index(b).unwrap();
                assert_eq!(combine_jungseong(first, second), jungseong_index(v));
            }
        }
        // Same for the compound finals.
        for f in JONGSEONG_CHARS.iter().flatten() {
            if let Some((a, b)) = decompose_compound_final(*f) {
                let first = jongseong_index(a).unwrap();
                let second = jongseong_index(b).unwrap();
                assert_eq!(combine_jongseong(first, second), jongseong_index(*f));
            }
        }
    }

    #[test]
    fn test_split_jongseong_matches_combine() {
        assert_eq!(split_jongseong(3), Some((1, 9))); // ㄳ -> ㄱ + ㅅ(초성)
        assert_eq!(split_jongseong(18), Some((17, 9))); // ㅄ -> ㅂ + ㅅ(초성)
        assert_eq!(split_jongseong(1), None);
    }

    #[test]
    fn test_jamo_stream() {
        assert_eq!(decompose_to_jamo_stream("한"), vec!['ㅎ', 'ㅏ', 'ㄴ']);
        // Compound vowel and final both split.
        assert_eq!(decompose_to_jamo_stream("왔"), vec!['ㅇ', 'ㅗ', 'ㅏ', 'ㅆ']);
        assert_eq!(decompose_to_jamo_stream("값"), vec!['ㄱ', 'ㅏ', 'ㅂ', 'ㅅ']);
        // Non-Hangul discarded.
        assert_eq!(decompose_to_jamo_stream("a1!"), Vec::<char>::new());
        assert_eq!(decompose_to_jamo_stream("ㅢ"), vec!['ㅡ', 'ㅣ']);
    }
}

//! Dubeolsik QWERTY layout: key↔jamo conversion and keyboard geometry.
//!
//! The forward table maps each Latin key to a jamo event for the composer;
//! the reverse tables write each jamo back to its key sequence (compound
//! vowels and finals render as the two keys that produce them). The geometry
//! table places each key on a fixed QWERTY grid for the keyboard-distance
//! similarity.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::compose::{Composer, JamoEvent};
use crate::jamo;
use crate::syllable;

/// Map a Latin key to its dubeolsik jamo event.
///
/// Unmapped characters (digits, punctuation, unshifted keys without a jamo)
/// return `None`.
pub fn key_to_jamo(c: char) -> Option<JamoEvent> {
    let consonant = |cho: u32, jong: Option<u32>| {
        Some(JamoEvent::Consonant { choseong: Some(cho), jongseong: jong })
    };
    let vowel = |jung: u32| Some(JamoEvent::Vowel { jungseong: jung });
    match c {
        'r' => consonant(0, Some(1)),   // ㄱ
        'R' => consonant(1, Some(2)),   // ㄲ
        's' => consonant(2, Some(4)),   // ㄴ
        'e' => consonant(3, Some(7)),   // ㄷ
        'E' => consonant(4, None),      // ㄸ
        'f' => consonant(5, Some(8)),   // ㄹ
        'a' => consonant(6, Some(16)),  // ㅁ
        'q' => consonant(7, Some(17)),  // ㅂ
        'Q' => consonant(8, None),      // ㅃ
        't' => consonant(9, Some(19)),  // ㅅ
        'T' => consonant(10, Some(20)), // ㅆ
        'd' => consonant(11, Some(21)), // ㅇ
        'w' => consonant(12, Some(22)), // ㅈ
        'W' => consonant(13, None),     // ㅉ
        'c' => consonant(14, Some(23)), // ㅊ
        'z' => consonant(15, Some(24)), // ㅋ
        'x' => consonant(16, Some(25)), // ㅌ
        'v' => consonant(17, Some(26)), // ㅍ
        'g' => consonant(18, Some(27)), // ㅎ
        'k' => vowel(0),                // ㅏ
        'o' => vowel(1),                // ㅐ
        'i' => vowel(2),                // ㅑ
        'O' => vowel(3),                // ㅒ
        'j' => vowel(4),                // ㅓ
        'p' => vowel(5),                // ㅔ
        'u' => vowel(6),                // ㅕ
        'P' => vowel(7),                // ㅖ
        'h' => vowel(8),                // ㅗ
        'y' => vowel(12),               // ㅛ
        'n' => vowel(13),               // ㅜ
        'b' => vowel(17),               // ㅠ
        'm' => vowel(18),               // ㅡ
        'l' => vowel(20),               // ㅣ
        _ => None,
    }
}

/// Key sequences for choseong indices.
const CHOSEONG_KEYS: [&str; 19] = [
    "r", "R", "s", "e", "E", "f", "a", "q", "Q", "t", "T", "d", "w", "W", "c", "z", "x", "v", "g",
];

/// Key sequences for jungseong indices; compounds use both component keys.
const JUNGSEONG_KEYS: [&str; 21] = [
    "k", "o", "i", "O", "j", "p", "u", "P", "h", "hk", "ho", "hl", "y", "n", "nj", "np", "nl", "b",
    "m", "ml", "l",
];

/// Key sequences for jongseong indices (index 0 is the empty final).
const JONGSEONG_KEYS: [&str; 28] = [
    "", "r", "R", "rt", "s", "sw", "sg", "e", "f", "fr", "fa", "fq", "ft", "fx", "fv", "fg", "a",
    "q", "qt", "t", "T", "d", "w", "c", "z", "x", "v", "g",
];

/// Key sequence producing a standalone compatibility jamo, if it has one.
pub fn jamo_char_to_keys(c: char) -> Option<&'static str> {
    if let Some(i) = jamo::jungseong_index(c) {
        return Some(JUNGSEONG_KEYS[i as usize]);
    }
    if let Some(i) = jamo::choseong_index(c) {
        return Some(CHOSEONG_KEYS[i as usize]);
    }
    // Final-only compounds such as ㄳ.
    if let Some(i) = jamo::jongseong_index(c) {
        return Some(JONGSEONG_KEYS[i as usize]);
    }
    None
}

/// Convert Latin keyboard input to Hangul by driving the composer.
///
/// Characters without a key mapping flush the pending syllable and pass
/// through unchanged.
pub fn convert_qwerty_to_hangul(input: &str) -> String {
    let mut composer = Composer::new();
    for c in input.chars() {
        match key_to_jamo(c) {
            Some(event) => composer.feed(event),
            None => composer.feed_passthrough(c),
        }
    }
    composer.finish()
}

/// Convert Hangul to the Latin keys that would type it.
///
/// Syllables decompose with compound vowels/finals kept together (each
/// rendering as its two-key sequence); standalone compatibility jamo map
/// directly; unrecognized tokens are preserved.
pub fn convert_hangul_to_qwerty(input: &str) -> String {
    let mut out = String::with_capacity(input.len() * 2);
    for c in input.chars() {
        if let Some((l, v, t)) = syllable::decompose(c) {
            out.push_str(CHOSEONG_KEYS[l as usize]);
            out.push_str(JUNGSEONG_KEYS[v as usize]);
            out.push_str(JONGSEONG_KEYS[t as usize]);
        } else if let Some(keys) = jamo_char_to_keys(c) {
            out.push_str(keys);
        } else {
            out.push(c);
        }
    }
    out
}

/// Physical key rows with their horizontal stagger offsets.
const KEY_ROWS: [&str; 4] = ["1234567890", "qwertyuiop", "asdfghjkl", "zxcvbnm"];
const ROW_OFFSETS: [f64; 4] = [0.0, 0.2, 0.6, 1.1];

static KEY_POSITIONS: Lazy<HashMap<char, (f64, f64)>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (row, keys) in KEY_ROWS.iter().enumerate() {
        for (col, c) in keys.chars().enumerate() {
            map.insert(c, (ROW_OFFSETS[row] + col as f64, row as f64));
        }
    }
    map
});

/// Position of a key on the QWERTY grid (input lowercased).
pub fn key_position(c: char) -> Option<(f64, f64)> {
    KEY_POSITIONS.get(&c.to_ascii_lowercase()).copied()
}

/// Substitution cost between two keys by Manhattan distance on the grid.
///
/// 0.0 when identical, 0.35 within distance 1, 0.65 within distance 2,
/// else 1.0 (including keys without a grid position).
pub fn substitution_cost(a: char, b: char) -> f64 {
    let a = a.to_ascii_lowercase();
    let b = b.to_ascii_lowercase();
    if a == b {
        return 0.0;
    }
    match (key_position(a), key_position(b)) {
        (Some((ax, ay)), Some((bx, by))) => {
            let d = (ax - bx).abs() + (ay - by).abs();
            if d <= 1.0 {
                0.35
            } else if d <= 2.0 {
                0.65
            } else {
                1.0
            }
        }
        _ => 1.0,
    }
}

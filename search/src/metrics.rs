//! Distance primitives for the similarity scorer.
//!
//! Levenshtein runs over Unicode code points with a two-row DP; the keyboard
//! variant reuses the same recurrence with per-key substitution costs from
//! the layout geometry.

use std::collections::HashSet;

use hansearch_core::layout;

/// Unit-cost Levenshtein distance over code-point slices.
pub fn levenshtein(left: &[char], right: &[char]) -> usize {
    if left.is_empty() {
        return right.len();
    }
    if right.is_empty() {
        return left.len();
    }
    let mut prev: Vec<usize> = (0..=right.len()).collect();
    let mut curr = vec![0usize; right.len() + 1];
    for (i, &lc) in left.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &rc) in right.iter().enumerate() {
            let cost = usize::from(lc != rc);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[right.len()]
}

/// `1 - lev / max(|l|, |r|)`; 1.0 when both sides are empty.
pub fn edit_similarity(left: &str, right: &str) -> f64 {
    let l: Vec<char> = left.chars().collect();
    let r: Vec<char> = right.chars().collect();
    let max_len = l.len().max(r.len());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&l, &r) as f64 / max_len as f64
}

/// Weighted Levenshtein over Latin keyboard projections.
///
/// Both sides are projected with `convert_hangul_to_qwerty`, lowercased and
/// restricted to keys the QWERTY grid knows. Insertions and deletions cost
/// 1.0; substitutions cost by key proximity.
pub fn keyboard_similarity(left: &str, right: &str) -> f64 {
    let l = latin_projection(left);
    let r = latin_projection(right);
    let max_len = l.len().max(r.len());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - weighted_levenshtein(&l, &r) / max_len as f64
}

fn latin_projection(s: &str) -> Vec<char> {
    layout::convert_hangul_to_qwerty(s)
        .to_lowercase()
        .chars()
        .filter(|&c| layout::key_position(c).is_some())
        .collect()
}

fn weighted_levenshtein(left: &[char], right: &[char]) -> f64 {
    if left.is_empty() {
        return right.len() as f64;
    }
    if right.is_empty() {
        return left.len() as f64;
    }
    let mut prev: Vec<f64> = (0..=right.len()).map(|j| j as f64).collect();
    let mut curr = vec![0.0f64; right.len() + 1];
    for (i, &lc) in left.iter().enumerate() {
        curr[0] = (i + 1) as f64;
        for (j, &rc) in right.iter().enumerate() {
            let substitution = prev[j] + layout::substitution_cost(lc, rc);
            curr[j + 1] = (prev[j + 1] + 1.0).min(curr[j] + 1.0).min(substitution);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[right.len()]
}

/// The distinct k-grams of a string, over code points.
pub fn kgrams(s: &str, k: usize) -> HashSet<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut grams = HashSet::new();
    if k == 0 || chars.len() < k {
        return grams;
    }
    for window in chars.windows(k) {
        grams.insert(window.iter().collect());
    }
    grams
}

/// Jaccard index of two sets; 0.0 when the union is empty.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Jaccard index over the character sets of two strings.
pub fn char_jaccard(a: &str, b: &str) -> f64 {
    let sa: HashSet<char> = a.chars().collect();
    let sb: HashSet<char> = b.chars().collect();
    let intersection = sa.intersection(&sb).count();
    let union = sa.len() + sb.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein(&chars("kitten"), &chars("sitting")), 3);
        assert_eq!(levenshtein(&chars(""), &chars("abc")), 3);
        assert_eq!(levenshtein(&chars("검색"), &chars("검삭")), 1);
        assert_eq!(levenshtein(&chars("같다"), &chars("같다")), 0);
    }

    #[test]
    fn test_edit_similarity() {
        assert_eq!(edit_similarity("", ""), 1.0);
        assert_eq!(edit_similarity("검색", "검삭"), 0.5);
        assert_eq!(edit_similarity("ab", "cd"), 0.0);
    }

    #[test]
    fn test_keyboard_similarity_identical_projection() {
        // The target types as exactly the query's keys.
        assert_eq!(keyboard_similarity("vmfhsxmdpsem", "프론트엔드"), 1.0);
    }

    #[test]
    fn test_keyboard_similarity_neighbor_cheaper_than_far() {
        let near = keyboard_similarity("가", "사"); // r vs t: adjacent keys
        let far = keyboard_similarity("가", "마"); // r vs a: distant keys
        assert!(near > far);
    }

    #[test]
    fn test_kgrams() {
        let grams = kgrams("ㄱㅅㄱ", 2);
        assert_eq!(grams.len(), 2);
        assert!(grams.contains("ㄱㅅ"));
        assert!(grams.contains("ㅅㄱ"));
        assert!(kgrams("ㄱ", 2).is_empty());
    }

    #[test]
    fn test_jaccard() {
        let a = kgrams("ㄱㅅㄷ", 2);
        let b = kgrams("ㄱㅅㅈ", 2);
        // {ㄱㅅ, ㅅㄷ} vs {ㄱㅅ, ㅅㅈ}: 1 shared out of 3.
        assert!((jaccard(&a, &b) - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(jaccard(&HashSet::new(), &HashSet::new()), 0.0);
    }

    #[test]
    fn test_char_jaccard() {
        assert_eq!(char_jaccard("ㄱㅅ", "ㄱㅅ"), 1.0);
        assert_eq!(char_jaccard("ㄱ", "ㅅ"), 0.0);
        assert_eq!(char_jaccard("", ""), 0.0);
    }
}

//! Inverted k-gram index over the choseong key vector.
//!
//! Each k-gram of a key maps to the sorted list of item indices containing
//! it; query candidates come from intersecting the postings of the query's
//! distinct k-grams by sorted merge.

use ahash::AHashMap;

/// Supported k range; anything else clamps into it.
pub const MIN_K: usize = 2;
pub const MAX_K: usize = 3;

pub fn clamp_k(k: usize) -> usize {
    k.clamp(MIN_K, MAX_K)
}

/// Sliding k-grams of a string, in order and with duplicates.
pub fn kgrams_ordered(s: &str, k: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    if k == 0 || chars.len() < k {
        return Vec::new();
    }
    chars.windows(k).map(|w| w.iter().collect()).collect()
}

#[derive(Debug)]
pub struct NgramIndex {
    k: usize,
    postings: AHashMap<String, Vec<u32>>,
}

impl NgramIndex {
    /// Build postings from the choseong key vector; entries stay sorted
    /// because keys are scanned in index order.
    pub fn build(keys: &[String], k: usize) -> Self {
        let k = clamp_k(k);
        let mut postings: AHashMap<String, Vec<u32>> = AHashMap::new();
        for (index, key) in keys.iter().enumerate() {
            for gram in kgrams_ordered(key, k) {
                let list = postings.entry(gram).or_default();
                if list.last() != Some(&(index as u32)) {
                    list.push(index as u32);
                }
            }
        }
        Self { k, postings }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Candidate indices for a query.
    ///
    /// `None` means the query has no k-grams and every index is a candidate;
    /// `Some(vec![])` means some gram has no postings at all.
    pub fn candidates(&self, query: &str) -> Option<Vec<u32>> {
        let mut grams = kgrams_ordered(query, self.k);
        if grams.is_empty() {
            return None;
        }
        grams.sort();
        grams.dedup();

        let mut result: Option<Vec<u32>> = None;
        for gram in &grams {
            let postings = match self.postings.get(gram) {
                Some(p) => p,
                None => return Some(Vec::new()),
            };
            result = Some(match result {
                None => postings.clone(),
                Some(acc) => intersect_sorted(&acc, postings),
            });
            if matches!(result.as_deref(), Some([])) {
                return Some(Vec::new());
            }
        }
        result
    }
}

/// Intersection of two sorted index lists by linear merge.
fn intersect_sorted(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_clamp_k() {
        assert_eq!(clamp_k(0), 2);
        assert_eq!(clamp_k(2), 2);
        assert_eq!(clamp_k(3), 3);
        assert_eq!(clamp_k(9), 3);
    }

    #[test]
    fn test_postings_sorted_and_deduped() {
        // "ㄱㅅㄱㅅ" contains the gram ㄱㅅ twice; index appears once.
        let index = NgramIndex::build(&keys(&["ㄱㅅㄱㅅ", "ㄱㅅ"]), 2);
        assert_eq!(index.candidates("ㄱㅅ"), Some(vec![0, 1]));
    }

    #[test]
    fn test_candidates_intersection() {
        let index = NgramIndex::build(&keys(&["ㅍㄹㅌㅇㄷ", "ㅂㅇㄷ", "ㄷㅇㅌ"]), 2);
        assert_eq!(index.candidates("ㅍㄹ"), Some(vec![0]));
        assert_eq!(index.candidates("ㅇㄷ"), Some(vec![0, 1]));
        // Multiple grams intersect.
        assert_eq!(index.candidates("ㅍㄹㅌ"), Some(vec![0]));
        // A gram with no postings empties the result.
        assert_eq!(index.candidates("ㅎㅎ"), Some(vec![]));
        // Too short for any gram: all indices are candidates.
        assert_eq!(index.candidates("ㅍ"), None);
    }

    #[test]
    fn test_intersect_sorted() {
        assert_eq!(intersect_sorted(&[1, 3, 5, 7], &[2, 3, 7, 9]), vec![3, 7]);
        assert_eq!(intersect_sorted(&[], &[1]), Vec::<u32>::new());
    }
}

//! String similarity measures over normalized labels.

use super::{ConceptView, SimilarityMeasure, normalize_label};

/// Shortest shared run that counts as a common substring.
const MIN_COMMON_LEN: usize = 2;

/// Common-substring similarity.
///
/// Repeatedly finds the longest substring shared by both labels, removes it
/// from each, and stops once no shared run of at least two characters is
/// left. The score is `2 * shared / (|a| + |b|)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringSimilarity;

impl SimilarityMeasure for SubstringSimilarity {
    fn name(&self) -> &str {
        "substring"
    }

    fn score(&self, a: ConceptView<'_>, b: ConceptView<'_>) -> f64 {
        substring_similarity(&normalize_label(a.label), &normalize_label(b.label))
    }
}

/// Normalized Levenshtein similarity (`1 - distance / max_len`).
#[derive(Debug, Clone, Copy, Default)]
pub struct LevenshteinSimilarity;

impl SimilarityMeasure for LevenshteinSimilarity {
    fn name(&self) -> &str {
        "levenshtein"
    }

    fn score(&self, a: ConceptView<'_>, b: ConceptView<'_>) -> f64 {
        levenshtein_similarity(&normalize_label(a.label), &normalize_label(b.label))
    }
}

/// Levenshtein similarity of two already-normalized strings. Empty labels
/// carry no evidence and score 0.
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(a, b)
}

/// Common-substring similarity of two already-normalized strings.
pub fn substring_similarity(a: &str, b: &str) -> f64 {
    let mut a: Vec<char> = a.chars().collect();
    let mut b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut shared = 0usize;
    while let Some((start_a, start_b, len)) = longest_common_run(&a, &b) {
        if len < MIN_COMMON_LEN {
            break;
        }
        shared += len;
        a.drain(start_a..start_a + len);
        b.drain(start_b..start_b + len);
    }

    (2.0 * shared as f64) / total as f64
}

/// Longest common substring as `(start_in_a, start_in_b, len)`.
///
/// Ties resolve to the earliest position in `a`, then in `b`.
fn longest_common_run(a: &[char], b: &[char]) -> Option<(usize, usize, usize)> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    // prev[j + 1] = length of the common suffix ending at a[i - 1], b[j]
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    let mut best = (0usize, 0usize, 0usize);

    for i in 0..a.len() {
        for j in 0..b.len() {
            curr[j + 1] = if a[i] == b[j] { prev[j] + 1 } else { 0 };
            let len = curr[j + 1];
            if len > best.2 {
                best = (i + 1 - len, j + 1 - len, len);
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best.2 > 0).then_some(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::{Concept, ConceptKind};

    fn view(c: &Concept) -> ConceptView<'_> {
        ConceptView::from(c)
    }

    #[test]
    fn identical_labels_score_one() {
        assert!((substring_similarity("paper", "paper") - 1.0).abs() < 1e-12);
        assert!((levenshtein_similarity("paper", "paper") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn disjoint_labels_score_zero() {
        assert_eq!(substring_similarity("abc", "xyz"), 0.0);
        assert_eq!(levenshtein_similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn empty_labels_score_zero() {
        assert_eq!(substring_similarity("", ""), 0.0);
        assert_eq!(substring_similarity("paper", ""), 0.0);
        assert_eq!(levenshtein_similarity("", ""), 0.0);
    }

    #[test]
    fn substring_counts_every_shared_run() {
        // "conference paper" vs "paper conference": both words are shared.
        let sim = substring_similarity("conference paper", "paper conference");
        assert!(sim > 0.9, "got {sim}");

        // "author" within "co author": 6 shared, 2*6/(6+9)
        let sim = substring_similarity("author", "co author");
        assert!((sim - 12.0 / 15.0).abs() < 1e-12, "got {sim}");
    }

    #[test]
    fn single_char_overlap_is_ignored() {
        assert_eq!(substring_similarity("ab", "bc"), 0.0);
    }

    #[test]
    fn longest_common_run_prefers_earliest() {
        let a: Vec<char> = "abxab".chars().collect();
        let b: Vec<char> = "ab".chars().collect();
        assert_eq!(longest_common_run(&a, &b), Some((0, 0, 2)));
    }

    #[test]
    fn measures_normalize_labels() {
        let a = Concept::new("a", "hasAuthor", ConceptKind::Property);
        let b = Concept::new("b", "has_author", ConceptKind::Property);
        assert!((SubstringSimilarity.score(view(&a), view(&b)) - 1.0).abs() < 1e-12);
        assert!((LevenshteinSimilarity.score(view(&a), view(&b)) - 1.0).abs() < 1e-12);
    }
}

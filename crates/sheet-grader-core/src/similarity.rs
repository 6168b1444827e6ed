//! Fuzzy text similarity between an expected answer and a student answer.
//!
//! # Normalization
//!
//! Both strings are normalized before comparison:
//!
//! 1. Leading and trailing whitespace is removed.
//! 2. Internal whitespace runs collapse to a single space.
//! 3. Text is lowercased.
//!
//! Two answers are an exact match when their normalized forms are equal.
//!
//! # Scoring
//!
//! ```text
//! score = max(0, 1 - d / len(expected))
//! ```
//!
//! where `d` is the Levenshtein distance between the normalized strings and
//! lengths are counted in `char`s. For a fixed expected answer the score is
//! non-increasing in `d`. If either normalized string is empty the score is
//! `0.0`.

/// Normalize text for comparison: trim, collapse whitespace, lowercase.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Levenshtein distance (insert, delete, substitute; unit costs).
///
/// Uses a single rolling row, so memory is `O(len(b))`.
pub fn edit_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            let cost = if ca == cb { 0 } else { 1 };
            row[j + 1] = (diag + cost).min(above + 1).min(row[j] + 1);
            diag = above;
        }
    }
    row[b.len()]
}

/// Similarity of `actual` to `expected`, in `[0.0, 1.0]`.
///
/// Returns exactly `1.0` when the normalized strings are identical and
/// non-empty, and exactly `0.0` when either normalized string is empty.
pub fn score(expected: &str, actual: &str) -> f64 {
    let expected: Vec<char> = normalize(expected).chars().collect();
    let actual: Vec<char> = normalize(actual).chars().collect();

    if expected.is_empty() || actual.is_empty() {
        return 0.0;
    }
    if expected == actual {
        return 1.0;
    }

    let distance = edit_distance(&expected, &actual);
    (1.0 - distance as f64 / expected.len() as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize("  The   Mitochondria\t\nIS  "), "the mitochondria is");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_edit_distance_basics() {
        assert_eq!(edit_distance(&chars(""), &chars("abc")), 3);
        assert_eq!(edit_distance(&chars("abc"), &chars("")), 3);
        assert_eq!(edit_distance(&chars("kitten"), &chars("sitting")), 3);
        assert_eq!(edit_distance(&chars("newton"), &chars("newtown")), 1);
        assert_eq!(edit_distance(&chars("same"), &chars("same")), 0);
    }

    #[test]
    fn test_case_and_whitespace_only_differences_score_one() {
        assert_eq!(score("Paris", "paris"), 1.0);
        assert_eq!(score("  Paris ", "PARIS"), 1.0);
        assert_eq!(score("light   energy", " Light energy "), 1.0);
    }

    #[test]
    fn test_identity() {
        for s in ["cat", "H2O", "Photosynthesis converts light energy"] {
            assert_eq!(score(s, s), 1.0, "score({:?}, itself)", s);
        }
    }

    #[test]
    fn test_empty_sides_score_zero() {
        assert_eq!(score("cat", ""), 0.0);
        assert_eq!(score("cat", "   "), 0.0);
        assert_eq!(score("", "cat"), 0.0);
        assert_eq!(score("", ""), 0.0);
    }

    #[test]
    fn test_cat_ordering() {
        let exact = score("cat", "cat");
        let close = score("cat", "cot");
        let far = score("cat", "dog");
        assert_eq!(exact, 1.0);
        assert!(close < 1.0);
        assert!(far < 1.0);
        assert!(close > far);
    }

    #[test]
    fn test_one_char_difference() {
        let s = score("Newton", "Newtown");
        assert!((s - (1.0 - 1.0 / 6.0)).abs() < 1e-12, "got {}", s);
    }

    #[test]
    fn test_monotonic_in_edits() {
        // Each variant applies one more edit than the previous one.
        let expected = "photosynthesis";
        let variants = [
            "photosynthesis",
            "photosynthesys",
            "fotosynthesys",
            "fotosinthesys",
            "fotosinthesy",
            "fotosinthes",
        ];
        let e: Vec<char> = expected.chars().collect();
        let mut prev_d = 0;
        let mut prev_score = f64::INFINITY;
        for v in variants {
            let d = edit_distance(&e, &chars(v));
            let s = score(expected, v);
            assert!(d >= prev_d, "variants must be ordered by distance");
            assert!(s <= prev_score, "{} scored {} after {}", v, s, prev_score);
            prev_d = d;
            prev_score = s;
        }
    }

    #[test]
    fn test_longer_insertions_do_not_beat_fewer_substitutions() {
        let subs = score("abc", "xyc");
        let inserts = score("abc", "abcxyz");
        assert!(subs >= inserts, "2 edits {} vs 3 edits {}", subs, inserts);
    }

    #[test]
    fn test_range_and_determinism() {
        let pairs = [
            ("cat", "catastrophe"),
            ("a", "zzzzzzzzzz"),
            ("Mitochondria", "powerhouse"),
            ("H2O", "h 2 o"),
        ];
        for (e, a) in pairs {
            let s1 = score(e, a);
            let s2 = score(e, a);
            assert_eq!(s1, s2);
            assert!((0.0..=1.0).contains(&s1), "{} vs {} gave {}", e, a, s1);
        }
    }

    #[test]
    fn test_multibyte_characters() {
        assert_eq!(score("Café", "CAFÉ"), 1.0);
        let s = score("naïve", "naive");
        assert!((s - 0.8).abs() < 1e-12, "got {}", s);
    }
}

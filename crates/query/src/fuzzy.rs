//! Fuzzy string matcher (spec §4.3.1). Every comparison is case-insensitive.

use strsim::levenshtein;

/// Tuning knobs for [`is_match`]. Defaults per spec: threshold 0.7, max
/// edit distance 3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyOptions {
    // Copy: cheap enough to pass by value out of a borrowed `Filter`.
    /// Minimum similarity, in `[0, 1]`, required for a word or whole-string match.
    pub threshold: f64,
    /// Maximum Levenshtein distance allowed for a whole-string match.
    pub max_distance: usize,
}

impl Default for FuzzyOptions {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            max_distance: 3,
        }
    }
}

/// True if `query` fuzzy-matches `candidate` under `options`.
pub fn is_match(query: &str, candidate: &str, options: FuzzyOptions) -> bool {
    let q = query.to_lowercase();
    let s = candidate.to_lowercase();

    if s.contains(&q) || q.contains(&s) {
        return true;
    }

    let q_words: Vec<&str> = q.split_whitespace().collect();
    let s_words: Vec<&str> = s.split_whitespace().collect();
    if q_words.len() > 1 && s_words.len() > 1 {
        let required = (q_words.len().min(s_words.len()) / 2).max(1);
        let matched = q_words
            .iter()
            .filter(|qw| s_words.iter().any(|sw| similarity(qw, sw) >= options.threshold))
            .count();
        return matched >= required;
    }

    let distance = levenshtein(&q, &s);
    let max_len = q.chars().count().max(s.chars().count()).max(1);
    distance <= options.max_distance && 1.0 - (distance as f64 / max_len as f64) >= options.threshold
}

fn similarity(a: &str, b: &str) -> f64 {
    let distance = levenshtein(a, b);
    let max_len = a.chars().count().max(b.chars().count()).max(1);
    1.0 - (distance as f64 / max_len as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_either_direction_matches() {
        let options = FuzzyOptions::default();
        assert!(is_match("lov", "ada lovelace", options));
        assert!(is_match("ada lovelace", "lace", options));
    }

    #[test]
    fn empty_strings_match() {
        assert!(is_match("", "", FuzzyOptions::default()));
    }

    #[test]
    fn multi_word_requires_half_the_words_to_match() {
        let options = FuzzyOptions::default();
        assert!(is_match("ada lovelace", "ada lovelac", options));
        assert!(!is_match("grace hopper", "ada lovelace", options));
    }

    #[test]
    fn single_word_uses_levenshtein_distance_and_threshold() {
        let options = FuzzyOptions::default();
        assert!(is_match("lovelace", "lovelase", options));
        assert!(!is_match("lovelace", "zzzzzzzz", options));
    }

    #[test]
    fn distance_beyond_max_never_matches_even_above_threshold() {
        let options = FuzzyOptions {
            threshold: 0.0,
            max_distance: 1,
        };
        assert!(!is_match("ab", "xy", options));
    }
}

//! Text features for similarity grouping: tokenization, term-frequency
//! vectors and cosine similarity.

use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Common English function words excluded from every token stream.
const STOP_WORDS: [&str; 72] = [
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "with", "by", "of",
    "about", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do",
    "does", "did", "doing", "i", "you", "he", "she", "it", "we", "they", "this", "that",
    "these", "those", "am", "your", "his", "her", "its", "our", "their", "what", "which",
    "who", "whom", "whose", "when", "where", "why", "how", "all", "any", "both", "each",
    "few", "more", "most", "some", "such", "no", "not", "only", "same", "than", "too",
    "very",
];

/// Tokenizer and vectorizer state, built once per session.
///
/// Owns the compiled punctuation pattern and the stop-word set so repeated
/// tokenize calls stay cheap; all methods are pure functions of their input.
pub struct TextAnalyzer {
    non_word: Regex,
    stop_words: HashSet<&'static str>,
}

impl TextAnalyzer {
    pub fn new() -> TextAnalyzer {
        TextAnalyzer {
            non_word: Regex::new(r"[^\w\s]").expect("hard-coded pattern compiles"),
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    /// Extract meaningful terms: lowercase, punctuation replaced with
    /// whitespace, split on whitespace, tokens of length ≤ 2 and stop words
    /// discarded.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let cleaned = self.non_word.replace_all(&lowered, " ");
        cleaned
            .split_whitespace()
            .filter(|word| word.chars().count() > 2 && !self.stop_words.contains(word))
            .map(str::to_string)
            .collect()
    }

    /// Ordered, deduplicated union of all terms across `texts`. The order is
    /// first-seen, so vectors built against it are reproducible for a batch.
    pub fn vocabulary<'a, I>(&self, texts: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let mut vocabulary = Vec::new();
        for text in texts {
            for term in self.tokenize(text) {
                if seen.insert(term.clone()) {
                    vocabulary.push(term);
                }
            }
        }
        vocabulary
    }

    /// Term-frequency vector for `text` over a fixed vocabulary.
    pub fn vectorize(&self, text: &str, vocabulary: &[String]) -> Vec<f64> {
        let mut frequencies: HashMap<String, f64> = HashMap::new();
        for term in self.tokenize(text) {
            *frequencies.entry(term).or_insert(0.0) += 1.0;
        }

        vocabulary
            .iter()
            .map(|term| frequencies.get(term).copied().unwrap_or(0.0))
            .collect()
    }
}

impl Default for TextAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Cosine similarity of two term-frequency vectors, in [0, 1].
/// Zero if either vector is all-zero.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let mut dot_product = 0.0;
    let mut mag_a = 0.0;
    let mut mag_b = 0.0;

    for (x, y) in a.iter().zip(b.iter()) {
        dot_product += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot_product / (mag_a.sqrt() * mag_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_stop_words_and_short_tokens() {
        let analyzer = TextAnalyzer::new();

        assert_eq!(
            analyzer.tokenize("The Quick Brown Fox and the Lazy Dog"),
            vec!["quick", "brown", "fox", "lazy", "dog"]
        );
    }

    #[test]
    fn test_tokenize_replaces_punctuation() {
        let analyzer = TextAnalyzer::new();

        assert_eq!(
            analyzer.tokenize("rust-lang/rust: Empowering everyone!"),
            vec!["rust", "lang", "rust", "empowering", "everyone"]
        );
    }

    #[test]
    fn test_tokenize_empty_input() {
        let analyzer = TextAnalyzer::new();
        assert!(analyzer.tokenize("").is_empty());
        assert!(analyzer.tokenize("a an to").is_empty());
    }

    #[test]
    fn test_vocabulary_is_ordered_and_unique() {
        let analyzer = TextAnalyzer::new();
        let vocabulary = analyzer.vocabulary(["rust compiler", "compiler errors rust"]);

        assert_eq!(vocabulary, vec!["rust", "compiler", "errors"]);
    }

    #[test]
    fn test_vectorize_counts_term_frequency() {
        let analyzer = TextAnalyzer::new();
        let vocabulary = analyzer.vocabulary(["rust rust book"]);
        let vector = analyzer.vectorize("rust rust book", &vocabulary);

        assert_eq!(vector, vec![2.0, 1.0]);
    }

    #[test]
    fn test_vectorize_unknown_terms_are_zero() {
        let analyzer = TextAnalyzer::new();
        let vocabulary = vec!["rust".to_string(), "python".to_string()];
        let vector = analyzer.vectorize("haskell weekly", &vocabulary);

        assert_eq!(vector, vec![0.0, 0.0]);
    }

    #[test]
    fn test_cosine_similarity_bounds() {
        let pairs = [
            (vec![1.0, 2.0, 0.0], vec![2.0, 1.0, 1.0]),
            (vec![1.0, 0.0], vec![0.0, 1.0]),
            (vec![3.0, 4.0], vec![3.0, 4.0]),
        ];

        for (a, b) in &pairs {
            let similarity = cosine_similarity(a, b);
            assert!((0.0..=1.0).contains(&similarity), "out of bounds: {similarity}");
        }
    }

    #[test]
    fn test_cosine_similarity_self_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_similarity_symmetric() {
        let a = vec![1.0, 0.0, 2.0];
        let b = vec![0.0, 1.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let zero = vec![0.0, 0.0];
        let v = vec![1.0, 1.0];
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }
}

//! Tokenization and TF-IDF vectorization for transaction titles

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lowercase a title and strip everything but letters, digits, and spaces
pub fn normalize(text: &str) -> String {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    let re = NON_WORD.get_or_init(|| Regex::new(r"[^a-z0-9\s]").unwrap());
    re.replace_all(&text.to_lowercase(), " ").trim().to_string()
}

/// Lowercase word tokens, alphanumerics only
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .map(String::from)
        .collect()
}

/// Unigrams plus adjacent bigrams ("uber eats" -> ["uber", "eats", "uber eats"])
fn ngrams(tokens: &[String]) -> Vec<String> {
    let mut grams: Vec<String> = tokens.to_vec();
    for pair in tokens.windows(2) {
        grams.push(format!("{} {}", pair[0], pair[1]));
    }
    grams
}

/// TF-IDF vectorizer over unigrams and bigrams
///
/// IDF uses the smoothed form ln((1 + n) / (1 + df)) + 1 and output vectors
/// are L2-normalized, so cosine-style dot products are well behaved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    pub vocabulary: HashMap<String, usize>,
    pub idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Fit the vocabulary and IDF weights on a corpus of documents
    pub fn fit(documents: &[String]) -> Self {
        let n_docs = documents.len();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let mut grams = ngrams(&tokenize(doc));
            grams.sort();
            grams.dedup();
            for gram in grams {
                *doc_freq.entry(gram).or_insert(0) += 1;
            }
        }

        // Sorted terms for a stable vocabulary ordering
        let mut terms: Vec<(String, usize)> = doc_freq.into_iter().collect();
        terms.sort();

        let mut vocabulary = HashMap::new();
        let mut idf = Vec::with_capacity(terms.len());
        for (i, (term, df)) in terms.into_iter().enumerate() {
            vocabulary.insert(term, i);
            idf.push(((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0);
        }

        Self { vocabulary, idf }
    }

    pub fn dimension(&self) -> usize {
        self.idf.len()
    }

    /// Transform a document into a sparse L2-normalized TF-IDF vector
    ///
    /// Returns (feature_index, weight) pairs sorted by index. Terms outside
    /// the fitted vocabulary are dropped.
    pub fn transform(&self, document: &str) -> Vec<(usize, f64)> {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for gram in ngrams(&tokenize(document)) {
            if let Some(&idx) = self.vocabulary.get(&gram) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();

        let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in vector.iter_mut() {
                *w /= norm;
            }
        }
        vector.sort_by_key(|(idx, _)| *idx);
        vector
    }
}

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::collections::{HashMap, HashSet};

use crate::models::{same_folded, Task};

/// A name must score above this to be offered as a suggestion.
pub const SUGGESTION_THRESHOLD: f64 = 0.3;

const STRING_WEIGHT: f64 = 0.7;
const TFIDF_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Exact(String),
    Suggestion { name: String, score: f64 },
    NotFound,
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|s| s.chars().filter(|c| c.is_alphanumeric() || *c == '_').collect())
        .filter(|s: &String| !s.is_empty())
        .collect()
}

fn term_frequencies(tokens: &[String], vocabulary: &HashMap<String, usize>) -> HashMap<usize, f64> {
    let mut tf = HashMap::new();
    if tokens.is_empty() {
        return tf;
    }
    for token in tokens {
        if let Some(&word) = vocabulary.get(token) {
            *tf.entry(word).or_insert(0.0) += 1.0;
        }
    }
    let length = tokens.len() as f64;
    for count in tf.values_mut() {
        *count /= length;
    }
    tf
}

fn cosine_similarity(a: &HashMap<usize, f64>, b: &HashMap<usize, f64>) -> f64 {
    let dot: f64 = a.iter().map(|(k, v)| v * b.get(k).unwrap_or(&0.0)).sum();
    let norm_a: f64 = a.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b: f64 = b.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Substring containment scores high, otherwise an in-order character
/// overlap ratio.
fn string_similarity(input: &str, target: &str) -> f64 {
    let input = input.to_lowercase();
    let target = target.to_lowercase();

    if target.contains(&input) {
        return 0.8;
    }
    if input.contains(&target) {
        return 0.6;
    }

    let a: Vec<char> = input.chars().collect();
    let b: Vec<char> = target.chars().collect();
    let (mut i, mut j, mut common) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            common += 1;
            i += 1;
            j += 1;
        } else if i + 1 < a.len() && a[i + 1] == b[j] {
            i += 1;
        } else if j + 1 < b.len() && a[i] == b[j + 1] {
            j += 1;
        } else {
            i += 1;
            j += 1;
        }
    }

    let longest = a.len().max(b.len());
    if longest == 0 {
        0.0
    } else {
        common as f64 / longest as f64
    }
}

/// TF-IDF index over task or group names, used to resolve what the user
/// typed to a name that exists.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    vocabulary: HashMap<String, usize>,
    document_frequencies: Vec<f64>,
    vectors: Vec<HashMap<usize, f64>>,
    names: Vec<String>,
    total: usize,
}

impl NameIndex {
    pub fn build<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut vocabulary = HashMap::new();
        let mut doc_counts: HashMap<usize, f64> = HashMap::new();

        for name in &names {
            let mut unique = HashSet::new();
            for token in tokenize(name) {
                let next = vocabulary.len();
                let word = *vocabulary.entry(token).or_insert(next);
                unique.insert(word);
            }
            for word in unique {
                *doc_counts.entry(word).or_insert(0.0) += 1.0;
            }
        }

        let mut document_frequencies = vec![0.0; vocabulary.len()];
        for (word, count) in doc_counts {
            document_frequencies[word] = count;
        }

        let mut index = NameIndex {
            vocabulary,
            document_frequencies,
            vectors: Vec::new(),
            names: Vec::new(),
            total: names.len(),
        };
        index.vectors = names.iter().map(|name| index.weigh(name)).collect();
        index.names = names;
        index
    }

    fn weigh(&self, text: &str) -> HashMap<usize, f64> {
        let total = self.total as f64;
        term_frequencies(&tokenize(text), &self.vocabulary)
            .into_iter()
            .map(|(word, tf)| {
                // +1 smoothing on the document frequency
                let idf = (total / (self.document_frequencies[word] + 1.0)).ln();
                (word, tf * idf)
            })
            .collect()
    }

    pub fn resolve(&self, input: &str) -> Resolution {
        if let Some(exact) = self.names.iter().find(|n| n.as_str() == input) {
            return Resolution::Exact(exact.clone());
        }
        if let Some(exact) = self.names.iter().find(|n| same_folded(n, input)) {
            return Resolution::Exact(exact.clone());
        }

        let query = self.weigh(input);
        let mut best: Option<(&String, f64)> = None;
        for (name, vector) in self.names.iter().zip(&self.vectors) {
            let score = string_similarity(input, name) * STRING_WEIGHT
                + cosine_similarity(&query, vector) * TFIDF_WEIGHT;
            if score > SUGGESTION_THRESHOLD && best.map_or(true, |(_, s)| score > s) {
                best = Some((name, score));
            }
        }

        match best {
            Some((name, score)) => Resolution::Suggestion {
                name: name.clone(),
                score,
            },
            None => Resolution::NotFound,
        }
    }
}

/// Fuzzy search over name, description and tags; best match first.
pub fn search<'a>(tasks: &'a [Task], query: &str) -> Vec<(i64, &'a Task)> {
    let matcher = SkimMatcherV2::default();
    let mut hits: Vec<(i64, &Task)> = tasks
        .iter()
        .filter_map(|task| {
            let haystack = format!("{} {} {}", task.name, task.description, task.tags.join(" "));
            matcher.fuzzy_match(&haystack, query).map(|score| (score, task))
        })
        .collect();
    hits.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
    hits
}

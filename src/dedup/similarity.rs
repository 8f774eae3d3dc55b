use std::collections::BTreeSet;

use crate::cli::SimilarityMetric;

/// Grouping key for a heading: lowercase, punctuation and symbols (emoji
/// included) removed, whitespace collapsed.
pub fn heading_key(heading: &str) -> String {
    let kept = heading
        .chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect::<String>();
    kept.split_whitespace().collect::<Vec<&str>>().join(" ")
}

pub fn token_set(text: &str) -> BTreeSet<String> {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Token-set similarity in `[0, 1]`. Two empty bodies are identical; an empty
/// body never matches a non-empty one.
pub fn similarity(left: &BTreeSet<String>, right: &BTreeSet<String>, metric: SimilarityMetric) -> f64 {
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let shared = left.intersection(right).count() as f64;
    match metric {
        SimilarityMetric::Jaccard => {
            let union = left.len() as f64 + right.len() as f64 - shared;
            shared / union
        }
        SimilarityMetric::Overlap => shared / left.len().min(right.len()) as f64,
    }
}

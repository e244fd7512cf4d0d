//! Similarity clustering over tab titles and domains.
//!
//! Clusters are formed greedily in input order with single links from each
//! seed tab only, not transitive closure across members. This is a deliberate
//! simplification, not hierarchical clustering.

use std::collections::HashMap;

use crate::domain::similarity_domain;
use crate::tab_data::Tab;
use crate::text::{TextAnalyzer, cosine_similarity};

/// Minimum cosine similarity for a tab to join a seed's cluster.
pub const SIMILARITY_THRESHOLD: f64 = 0.3;

/// Partition `tabs` into similarity clusters.
///
/// The feature text for each tab is `title + " " + domain` (display form).
/// Fewer than two tabs come back as a single cluster containing the input
/// unchanged, so an empty input yields one empty cluster.
pub fn cluster_by_similarity(analyzer: &TextAnalyzer, tabs: &[Tab], threshold: f64) -> Vec<Vec<Tab>> {
    if tabs.len() < 2 {
        return vec![tabs.to_vec()];
    }

    let texts: Vec<String> = tabs
        .iter()
        .map(|tab| format!("{} {}", tab.title, similarity_domain(&tab.url)).to_lowercase())
        .collect();

    let vocabulary = analyzer.vocabulary(texts.iter().map(String::as_str));
    let vectors: Vec<Vec<f64>> = texts
        .iter()
        .map(|text| analyzer.vectorize(text, &vocabulary))
        .collect();

    let count = tabs.len();
    let mut matrix = vec![vec![0.0; count]; count];
    for i in 0..count {
        for j in 0..count {
            matrix[i][j] = if i == j {
                1.0
            } else {
                cosine_similarity(&vectors[i], &vectors[j])
            };
        }
    }

    let mut visited = vec![false; count];
    let mut clusters = Vec::new();

    for i in 0..count {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        let mut members = vec![i];

        for j in 0..count {
            if i == j || visited[j] {
                continue;
            }
            if matrix[i][j] > threshold {
                visited[j] = true;
                members.push(j);
            }
        }

        clusters.push(members.into_iter().map(|index| tabs[index].clone()).collect());
    }

    clusters
}

/// Descriptive name for a cluster of tabs.
///
/// Preference order: the one shared non-empty domain; the top two common
/// title terms; the most frequent non-empty domain; `"Similar Tabs"`.
/// Empty input names to `"New Group"`.
pub fn generate_cluster_name(analyzer: &TextAnalyzer, tabs: &[Tab]) -> String {
    if tabs.is_empty() {
        return "New Group".to_string();
    }

    let domains: Vec<String> = tabs.iter().map(|tab| similarity_domain(&tab.url)).collect();

    let mut unique: Vec<&str> = domains
        .iter()
        .filter(|domain| !domain.is_empty())
        .map(String::as_str)
        .collect();
    unique.sort_unstable();
    unique.dedup();
    if unique.len() == 1 && domains.iter().all(|domain| !domain.is_empty()) {
        return unique[0].to_string();
    }

    let common = common_terms(analyzer, tabs);
    if !common.is_empty() {
        return common.into_iter().take(2).collect::<Vec<_>>().join(" ");
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for domain in &domains {
        if !domain.is_empty() {
            *counts.entry(domain.as_str()).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    // By count descending, ties by name ascending, so naming is reproducible.
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    if let Some((top, _)) = ranked.first() {
        return top.to_string();
    }

    "Similar Tabs".to_string()
}

/// Terms whose document frequency across tab titles reaches
/// `max(1, ceil(n / 3))`, ranked by frequency descending.
fn common_terms(analyzer: &TextAnalyzer, tabs: &[Tab]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for tab in tabs {
        // Each term counts once per tab.
        let mut terms = analyzer.tokenize(&tab.title);
        terms.sort_unstable();
        terms.dedup();
        for term in terms {
            *counts.entry(term).or_insert(0) += 1;
        }
    }

    let threshold = std::cmp::max(1, tabs.len().div_ceil(3));
    let mut common: Vec<(String, usize)> = counts
        .into_iter()
        .filter(|(_, count)| *count >= threshold)
        .collect();
    common.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    common.into_iter().map(|(term, _)| term).collect()
}

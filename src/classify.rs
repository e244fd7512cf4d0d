//! Classification: partition a tab snapshot into named, colored buckets.
//!
//! Every strategy starts with the custom-rule pass; what it does with the
//! unmatched remainder is what distinguishes them. Strategies are selected
//! explicitly by the caller — in particular, AI classification never falls
//! back to similarity clustering on its own (the two produce different
//! groupings and the user picked one).

use std::collections::BTreeMap;

use crate::ai::{TabClassifier, TabDescriptor};
use crate::cluster::{self, SIMILARITY_THRESHOLD};
use crate::domain::{display_domain, extract_domain};
use crate::error::Error;
use crate::rules::{CustomRule, match_rule};
use crate::tab_data::{GroupColor, Tab};
use crate::text::TextAnalyzer;

/// Which classifier handles tabs the rule pass left unmatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingStrategy {
    /// Custom rules only; everything else stays ungrouped.
    Rules,
    /// Bucket unmatched tabs by raw hostname.
    Domain,
    /// Cluster unmatched tabs by text similarity, locally.
    Similarity,
    /// Delegate unmatched tabs to the external classifier.
    Ai,
}

/// A named collection of tabs waiting to become a real group.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    /// Display title for the group. May differ from the bucket key: domain
    /// buckets are keyed by raw hostname but titled without a leading `www.`.
    pub title: String,
    pub color: GroupColor,
    pub tabs: Vec<Tab>,
}

/// The outcome of one classification run: bucket key → bucket.
///
/// Keys are ordered, so iteration (and therefore reconciliation) is
/// deterministic for a given input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    buckets: BTreeMap<String, Bucket>,
}

impl Classification {
    fn add(&mut self, key: &str, title: &str, color: GroupColor, tab: Tab) {
        self.buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket {
                title: title.to_string(),
                color,
                tabs: Vec::new(),
            })
            .tabs
            .push(tab);
    }

    /// Drop buckets below the grouping threshold. Single tabs are never
    /// turned into groups, whatever strategy produced them.
    fn retain_groupable(&mut self) {
        self.buckets.retain(|_, bucket| bucket.tabs.len() >= 2);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Bucket)> {
        self.buckets.iter()
    }

    pub fn get(&self, key: &str) -> Option<&Bucket> {
        self.buckets.get(key)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Stateless-per-run classification orchestrator. Owns the text analyzer so
/// the tokenizer is compiled once per session, not per run.
pub struct ClassifyEngine {
    analyzer: TextAnalyzer,
    similarity_threshold: f64,
}

impl ClassifyEngine {
    pub fn new() -> ClassifyEngine {
        ClassifyEngine {
            analyzer: TextAnalyzer::new(),
            similarity_threshold: SIMILARITY_THRESHOLD,
        }
    }

    /// Run one classification pass with the selected strategy.
    ///
    /// `GroupingStrategy::Ai` requires a classifier; passing `None` fails
    /// with `ClassifierNotConfigured` before any rule matching happens, so
    /// the caller can redirect the user to settings.
    pub async fn classify(
        &self,
        strategy: GroupingStrategy,
        tabs: &[Tab],
        rules: &[CustomRule],
        classifier: Option<&dyn TabClassifier>,
    ) -> Result<Classification, Error> {
        match strategy {
            GroupingStrategy::Rules => Ok(self.by_rules(tabs, rules)),
            GroupingStrategy::Domain => Ok(self.by_domain(tabs, rules)),
            GroupingStrategy::Similarity => Ok(self.by_similarity(tabs, rules)),
            GroupingStrategy::Ai => match classifier {
                Some(classifier) => self.by_ai(tabs, rules, classifier).await,
                None => Err(Error::ClassifierNotConfigured),
            },
        }
    }

    /// Custom rules only.
    pub fn by_rules(&self, tabs: &[Tab], rules: &[CustomRule]) -> Classification {
        let (mut result, _) = self.rule_pass(tabs, rules);
        result.retain_groupable();
        result
    }

    /// Rule pass, then raw-hostname buckets for the remainder. Tabs whose
    /// URL has no parsable host are skipped entirely.
    pub fn by_domain(&self, tabs: &[Tab], rules: &[CustomRule]) -> Classification {
        let (mut result, unmatched) = self.rule_pass(tabs, rules);

        for tab in unmatched {
            match extract_domain(&tab.url) {
                Some(domain) => {
                    let color = GroupColor::for_text(&domain);
                    let title = display_domain(&domain).to_string();
                    result.add(&domain, &title, color, tab);
                }
                None => {
                    log::debug!(
                        "tab {} not bucketable by domain: {}",
                        tab.id,
                        Error::InvalidUrl(tab.url.clone())
                    );
                }
            }
        }

        result.retain_groupable();
        result
    }

    /// Rule pass, then local similarity clusters for the remainder.
    pub fn by_similarity(&self, tabs: &[Tab], rules: &[CustomRule]) -> Classification {
        let (mut result, unmatched) = self.rule_pass(tabs, rules);

        let clusters =
            cluster::cluster_by_similarity(&self.analyzer, &unmatched, self.similarity_threshold);
        for members in clusters {
            if members.len() < 2 {
                continue;
            }
            let name = cluster::generate_cluster_name(&self.analyzer, &members);
            let color = GroupColor::for_text(&name);
            for tab in members {
                result.add(&name, &name, color, tab);
            }
        }

        result.retain_groupable();
        result
    }

    /// Rule pass, then the external classifier for the remainder.
    pub async fn by_ai(
        &self,
        tabs: &[Tab],
        rules: &[CustomRule],
        classifier: &dyn TabClassifier,
    ) -> Result<Classification, Error> {
        let (mut result, unmatched) = self.rule_pass(tabs, rules);

        if !unmatched.is_empty() {
            let descriptors: Vec<TabDescriptor> =
                unmatched.iter().map(TabDescriptor::from_tab).collect();
            let assignments = classifier.classify(&descriptors).await?;

            for assignment in assignments {
                let color = GroupColor::for_text(&assignment.category);
                for index in assignment.indices {
                    match unmatched.get(index) {
                        Some(tab) => {
                            result.add(&assignment.category, &assignment.category, color, tab.clone());
                        }
                        None => {
                            log::warn!(
                                "classifier addressed index {index} outside {} unmatched tabs",
                                unmatched.len()
                            );
                        }
                    }
                }
            }
        }

        result.retain_groupable();
        Ok(result)
    }

    /// The shared leading pass: peel off tabs a custom rule claims.
    fn rule_pass(&self, tabs: &[Tab], rules: &[CustomRule]) -> (Classification, Vec<Tab>) {
        let mut result = Classification::default();
        let mut unmatched = Vec::new();

        for tab in tabs {
            match match_rule(tab, rules) {
                Some(rule) => {
                    result.add(&rule.name, &rule.name, rule.effective_color(), tab.clone());
                }
                None => unmatched.push(tab.clone()),
            }
        }

        (result, unmatched)
    }
}

impl Default for ClassifyEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::CategoryAssignment;
    use futures::executor::block_on;
    use std::cell::Cell;

    fn tab(id: i32, url: &str, title: &str) -> Tab {
        Tab::new(id, url.to_string(), title.to_string(), 1)
    }

    fn domain_fixture() -> Vec<Tab> {
        vec![
            tab(1, "https://a.example.com/x", "A"),
            tab(2, "https://a.example.com/y", "B"),
            tab(3, "https://b.example.com/z", "C"),
        ]
    }

    struct ScriptedClassifier {
        reply: Result<Vec<CategoryAssignment>, Error>,
        calls: Cell<usize>,
    }

    #[async_trait::async_trait(?Send)]
    impl TabClassifier for ScriptedClassifier {
        async fn classify(&self, _tabs: &[TabDescriptor]) -> Result<Vec<CategoryAssignment>, Error> {
            self.calls.set(self.calls.get() + 1);
            self.reply.clone()
        }
    }

    #[test]
    fn test_by_domain_groups_shared_hosts_only() {
        let engine = ClassifyEngine::new();

        let result = engine.by_domain(&domain_fixture(), &[]);

        assert_eq!(result.len(), 1);
        let bucket = result.get("a.example.com").unwrap();
        assert_eq!(bucket.title, "a.example.com");
        let ids: Vec<i32> = bucket.tabs.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_by_domain_is_idempotent() {
        let engine = ClassifyEngine::new();
        let tabs = domain_fixture();

        assert_eq!(engine.by_domain(&tabs, &[]), engine.by_domain(&tabs, &[]));
    }

    #[test]
    fn test_by_domain_strips_www_for_title_not_key() {
        let engine = ClassifyEngine::new();
        let tabs = vec![
            tab(1, "https://www.example.com/a", "A"),
            tab(2, "https://www.example.com/b", "B"),
        ];

        let result = engine.by_domain(&tabs, &[]);

        let bucket = result.get("www.example.com").unwrap();
        assert_eq!(bucket.title, "example.com");
    }

    #[test]
    fn test_rule_precedence_over_domain() {
        let engine = ClassifyEngine::new();
        let rules = vec![CustomRule::new("Work", &["example.com"])];

        let result = engine.by_domain(&domain_fixture(), &rules);

        assert_eq!(result.len(), 1);
        let bucket = result.get("Work").unwrap();
        assert_eq!(bucket.tabs.len(), 3);
        assert!(result.get("a.example.com").is_none());
    }

    #[test]
    fn test_unparsable_urls_skip_domain_bucketing() {
        let engine = ClassifyEngine::new();
        let tabs = vec![
            tab(1, "about:blank", "New Tab"),
            tab(2, "about:blank", "New Tab"),
            tab(3, "https://a.example.com", "A"),
            tab(4, "https://a.example.com", "B"),
        ];

        let result = engine.by_domain(&tabs, &[]);

        // The two about:blank tabs never form a bucket.
        assert_eq!(result.len(), 1);
        assert!(result.get("a.example.com").is_some());
    }

    #[test]
    fn test_no_singleton_buckets_any_strategy() {
        let engine = ClassifyEngine::new();
        let rules = vec![CustomRule::new("Mail", &["mail"])];
        let tabs = vec![
            tab(1, "https://mail.example.com", "Inbox"),
            tab(2, "https://a.example.com", "A"),
            tab(3, "https://b.example.com", "zzz"),
        ];

        for result in [
            engine.by_rules(&tabs, &rules),
            engine.by_domain(&tabs, &rules),
            engine.by_similarity(&tabs, &rules),
        ] {
            for (key, bucket) in result.iter() {
                assert!(bucket.tabs.len() >= 2, "singleton bucket {key}");
            }
        }
    }

    #[test]
    fn test_by_rules_only_groups_matches() {
        let engine = ClassifyEngine::new();
        let rules = vec![CustomRule::new("Docs", &["docs"])];
        let tabs = vec![
            tab(1, "https://docs.rs/serde", "serde"),
            tab(2, "https://docs.rs/tokio", "tokio"),
            tab(3, "https://news.example.com", "News"),
            tab(4, "https://news.example.com", "More news"),
        ];

        let result = engine.by_rules(&tabs, &rules);

        assert_eq!(result.len(), 1);
        assert_eq!(result.get("Docs").unwrap().tabs.len(), 2);
    }

    #[test]
    fn test_by_similarity_names_and_groups_clusters() {
        let engine = ClassifyEngine::new();
        let tabs = vec![
            tab(1, "https://one.example.com", "rust compiler internals"),
            tab(2, "https://two.example.org", "rust compiler errors"),
        ];

        let result = engine.by_similarity(&tabs, &[]);

        assert_eq!(result.len(), 1);
        let (name, bucket) = result.iter().next().unwrap();
        assert_eq!(bucket.tabs.len(), 2);
        assert_eq!(bucket.color, GroupColor::for_text(name));
    }

    #[test]
    fn test_by_ai_buckets_by_returned_categories() {
        let engine = ClassifyEngine::new();
        let classifier = ScriptedClassifier {
            reply: Ok(vec![
                CategoryAssignment {
                    category: "Research".to_string(),
                    indices: vec![0, 1],
                },
                CategoryAssignment {
                    category: "Shopping".to_string(),
                    indices: vec![2],
                },
            ]),
            calls: Cell::new(0),
        };
        let tabs = vec![
            tab(1, "https://arxiv.org/abs/1", "Paper one"),
            tab(2, "https://arxiv.org/abs/2", "Paper two"),
            tab(3, "https://shop.example.com", "Cart"),
        ];

        let result = block_on(engine.by_ai(&tabs, &[], &classifier)).unwrap();

        assert_eq!(classifier.calls.get(), 1);
        assert_eq!(result.len(), 1);
        let bucket = result.get("Research").unwrap();
        assert_eq!(bucket.tabs.len(), 2);
        assert_eq!(bucket.color, GroupColor::for_text("Research"));
        // The singleton Shopping category was dropped.
        assert!(result.get("Shopping").is_none());
    }

    #[test]
    fn test_by_ai_skips_out_of_range_indices() {
        let engine = ClassifyEngine::new();
        let classifier = ScriptedClassifier {
            reply: Ok(vec![CategoryAssignment {
                category: "News".to_string(),
                indices: vec![0, 1, 99],
            }]),
            calls: Cell::new(0),
        };
        let tabs = vec![
            tab(1, "https://a.example.com", "A"),
            tab(2, "https://b.example.com", "B"),
        ];

        let result = block_on(engine.by_ai(&tabs, &[], &classifier)).unwrap();

        assert_eq!(result.get("News").unwrap().tabs.len(), 2);
    }

    #[test]
    fn test_by_ai_rule_matches_never_reach_classifier() {
        let engine = ClassifyEngine::new();
        let classifier = ScriptedClassifier {
            reply: Ok(vec![]),
            calls: Cell::new(0),
        };
        let rules = vec![CustomRule::new("Work", &["example.com"])];
        let tabs = vec![
            tab(1, "https://a.example.com", "A"),
            tab(2, "https://b.example.com", "B"),
        ];

        let result = block_on(engine.by_ai(&tabs, &rules, &classifier)).unwrap();

        // Everything matched a rule, so the classifier was never consulted.
        assert_eq!(classifier.calls.get(), 0);
        assert_eq!(result.get("Work").unwrap().tabs.len(), 2);
    }

    #[test]
    fn test_by_ai_propagates_classifier_errors() {
        let engine = ClassifyEngine::new();
        let classifier = ScriptedClassifier {
            reply: Err(Error::ClassifierRequest("http status 500".to_string())),
            calls: Cell::new(0),
        };
        let tabs = vec![
            tab(1, "https://a.example.com", "A"),
            tab(2, "https://b.example.com", "B"),
        ];

        let err = block_on(engine.by_ai(&tabs, &[], &classifier)).unwrap_err();
        assert_eq!(err.kind(), "classifier_request_failed");
    }

    #[test]
    fn test_classify_without_classifier_fails_fast() {
        let engine = ClassifyEngine::new();
        let tabs = domain_fixture();

        let err = block_on(engine.classify(GroupingStrategy::Ai, &tabs, &[], None)).unwrap_err();
        assert_eq!(err, Error::ClassifierNotConfigured);
    }
}

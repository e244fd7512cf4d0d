//! User-defined keyword rules mapping tabs to named groups.

use serde::{Deserialize, Deserializer, Serialize};

use crate::tab_data::{GroupColor, Tab};

/// A user-authored classification rule. The name doubles as the group title.
///
/// Keywords are stored lowercase; older installs persisted them as one
/// comma-separated string, which the deserializer normalizes to a list so
/// downstream code never branches on the raw persisted shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomRule {
    pub name: String,
    #[serde(default, deserialize_with = "keywords_list")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<GroupColor>,
}

impl CustomRule {
    pub fn new(name: &str, keywords: &[&str]) -> CustomRule {
        CustomRule {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            color: None,
        }
    }

    /// The rule's stored color, or a hash-derived one when unset.
    pub fn effective_color(&self) -> GroupColor {
        self.color.unwrap_or_else(|| GroupColor::for_text(&self.name))
    }

    /// Case-insensitive substring test of any keyword against the tab's
    /// title and URL. Rules without keywords never match.
    pub fn matches(&self, tab: &Tab) -> bool {
        if self.keywords.is_empty() {
            return false;
        }
        let haystack = format!("{} {}", tab.title, tab.url).to_lowercase();
        self.keywords
            .iter()
            .filter(|keyword| !keyword.is_empty())
            .any(|keyword| haystack.contains(&keyword.to_lowercase()))
    }
}

/// First rule in stored order matching the tab, if any.
pub fn match_rule<'a>(tab: &Tab, rules: &'a [CustomRule]) -> Option<&'a CustomRule> {
    rules.iter().find(|rule| rule.matches(tab))
}

/// Split a comma-separated keyword string into the canonical list form.
pub fn split_keywords(text: &str) -> Vec<String> {
    text.split(',')
        .map(|keyword| keyword.trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .collect()
}

/// Trim, lowercase and drop empty entries from an already-listed keyword set.
pub fn tidy_keywords(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|keyword| keyword.trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .collect()
}

fn keywords_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawKeywords {
        List(Vec<String>),
        Text(String),
    }

    match RawKeywords::deserialize(deserializer)? {
        RawKeywords::List(list) => Ok(tidy_keywords(&list)),
        RawKeywords::Text(text) => Ok(split_keywords(&text)),
    }
}

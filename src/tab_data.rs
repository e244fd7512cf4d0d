//! Data structures for tab-shepherd.

use serde::{Deserialize, Serialize};

/// Sentinel `groupId` the browser reports for tabs outside any group.
pub const TAB_GROUP_ID_NONE: i32 = -1;

/// Reserved collapse-state key for the synthetic ungrouped section.
pub const UNGROUPED_KEY: &str = "ungrouped";

/// Snapshot of one open browser tab.
///
/// Tabs are owned by the browser: the core only reads snapshots and issues
/// group-membership, activation and removal commands by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tab {
    pub id: i32,
    pub title: String,
    pub url: String,
    #[serde(rename = "windowId")]
    pub window_id: i32,
    #[serde(rename = "groupId")]
    pub group_id: i32,
    pub active: bool,
    #[serde(rename = "favIconUrl")]
    pub fav_icon_url: Option<String>,
}

impl Tab {
    pub fn new(id: i32, url: String, title: String, window_id: i32) -> Tab {
        Tab {
            id,
            title,
            url,
            window_id,
            group_id: TAB_GROUP_ID_NONE,
            active: false,
            fav_icon_url: None,
        }
    }

    pub fn is_grouped(&self) -> bool {
        self.group_id != TAB_GROUP_ID_NONE
    }
}

/// Snapshot of one live tab group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TabGroup {
    pub id: i32,
    #[serde(default)]
    pub title: String,
    pub color: GroupColor,
    pub collapsed: bool,
}

/// The browser's fixed tab-group palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupColor {
    Grey,
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
}

impl GroupColor {
    /// Colors handed out by the text hash. Grey is reserved for empty input.
    const WHEEL: [GroupColor; 7] = [
        GroupColor::Blue,
        GroupColor::Red,
        GroupColor::Yellow,
        GroupColor::Green,
        GroupColor::Pink,
        GroupColor::Purple,
        GroupColor::Cyan,
    ];

    /// Deterministic color for a group name, domain or AI category: sum of
    /// character codes of the lowercased text, modulo the palette size.
    /// The same text always maps to the same color; distinct texts may
    /// collide.
    pub fn for_text(text: &str) -> GroupColor {
        if text.is_empty() {
            return GroupColor::Grey;
        }
        let hash: u64 = text.to_lowercase().chars().map(|c| c as u64).sum();
        Self::WHEEL[(hash % Self::WHEEL.len() as u64) as usize]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupColor::Grey => "grey",
            GroupColor::Blue => "blue",
            GroupColor::Red => "red",
            GroupColor::Yellow => "yellow",
            GroupColor::Green => "green",
            GroupColor::Pink => "pink",
            GroupColor::Purple => "purple",
            GroupColor::Cyan => "cyan",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_creation() {
        let tab = Tab::new(1, "https://example.com".to_string(), "Example".to_string(), 7);

        assert_eq!(tab.id, 1);
        assert_eq!(tab.window_id, 7);
        assert_eq!(tab.group_id, TAB_GROUP_ID_NONE);
        assert!(!tab.is_grouped());
    }

    #[test]
    fn test_tab_deserializes_browser_shape() {
        let json = r#"{
            "id": 12,
            "title": "Docs",
            "url": "https://docs.example.com",
            "windowId": 3,
            "groupId": -1,
            "active": true,
            "index": 4,
            "pinned": false
        }"#;

        let tab: Tab = serde_json::from_str(json).unwrap();
        assert_eq!(tab.id, 12);
        assert_eq!(tab.window_id, 3);
        assert!(tab.active);
        assert_eq!(tab.fav_icon_url, None);
    }

    #[test]
    fn test_group_color_round_trip() {
        let group = TabGroup {
            id: 5,
            title: "News".to_string(),
            color: GroupColor::Purple,
            collapsed: false,
        };

        let json = serde_json::to_string(&group).unwrap();
        assert!(json.contains("\"purple\""));
        let back: TabGroup = serde_json::from_str(&json).unwrap();
        assert_eq!(back, group);
    }

    #[test]
    fn test_color_is_deterministic() {
        for text in ["github.com", "Work", "research papers", "a"] {
            assert_eq!(GroupColor::for_text(text), GroupColor::for_text(text));
        }
    }

    #[test]
    fn test_color_ignores_case() {
        assert_eq!(GroupColor::for_text("News"), GroupColor::for_text("news"));
    }

    #[test]
    fn test_empty_text_is_grey() {
        assert_eq!(GroupColor::for_text(""), GroupColor::Grey);
    }

    #[test]
    fn test_non_empty_text_never_grey() {
        for text in ["x", "github.com", "some very long group title"] {
            assert_ne!(GroupColor::for_text(text), GroupColor::Grey);
        }
    }
}

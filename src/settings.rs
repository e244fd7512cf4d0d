//! Durable user settings, persisted in the synced storage tier.
//!
//! Load failures fall back to built-in defaults (logged, non-fatal); save
//! failures surface to the caller. Rule keywords are normalized to the
//! canonical list shape here and in `rules.rs`, never downstream.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ai::DEFAULT_API_URL;
use crate::error::Error;
use crate::host::KeyValueStore;
use crate::rules::{CustomRule, tidy_keywords};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_url: String,
    pub api_key: String,
    pub custom_groups: Vec<CustomRule>,
    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            custom_groups: Vec::new(),
            theme: Theme::System,
        }
    }
}

impl Settings {
    /// Whether AI grouping can run at all.
    pub fn classifier_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Canonical form for persistence: trimmed fields, a usable endpoint,
    /// nameless rules dropped, keywords tidied.
    pub fn normalized(&self) -> Settings {
        let api_url = self.api_url.trim();
        let api_url = if api_url.is_empty() {
            DEFAULT_API_URL.to_string()
        } else {
            api_url.to_string()
        };

        let custom_groups = self
            .custom_groups
            .iter()
            .filter_map(|rule| {
                let name = rule.name.trim().to_string();
                if name.is_empty() {
                    return None;
                }
                Some(CustomRule {
                    name,
                    keywords: tidy_keywords(&rule.keywords),
                    color: rule.color,
                })
            })
            .collect();

        Settings {
            api_url,
            api_key: self.api_key.trim().to_string(),
            custom_groups,
            theme: self.theme,
        }
    }
}

/// Settings persistence over one key-value tier.
pub struct SettingsManager {
    store: Rc<dyn KeyValueStore>,
}

const SETTINGS_KEYS: [&str; 4] = ["apiUrl", "apiKey", "customGroups", "theme"];

impl SettingsManager {
    pub fn new(store: Rc<dyn KeyValueStore>) -> SettingsManager {
        SettingsManager { store }
    }

    /// Load settings, falling back to defaults when the store is unreadable
    /// or holds an unusable shape. This fallback is intentional: a popup
    /// with default settings beats a popup that cannot open.
    pub async fn load(&self) -> Settings {
        let entries = match self.store.read(&SETTINGS_KEYS).await {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!("settings read failed, using defaults: {err}");
                return Settings::default();
            }
        };

        match serde_json::from_value::<Settings>(Value::Object(entries)) {
            Ok(settings) => settings.normalized(),
            Err(err) => {
                log::warn!("stored settings were malformed, using defaults: {err}");
                Settings::default()
            }
        }
    }

    /// Persist the full settings object (normalized first).
    pub async fn save(&self, settings: &Settings) -> Result<(), Error> {
        let value = serde_json::to_value(settings.normalized())
            .map_err(|err| Error::SettingsPersistence(err.to_string()))?;
        match value {
            Value::Object(entries) => self.store.write(entries).await,
            _ => Err(Error::SettingsPersistence(
                "settings did not serialize to an object".to_string(),
            )),
        }
    }

    pub async fn custom_rules(&self) -> Vec<CustomRule> {
        self.load().await.custom_groups
    }

    pub async fn save_custom_rules(&self, rules: &[CustomRule]) -> Result<(), Error> {
        let mut settings = self.load().await;
        settings.custom_groups = rules.to_vec();
        self.save(&settings).await
    }

    pub async fn theme(&self) -> Theme {
        self.load().await.theme
    }

    pub async fn save_theme(&self, theme: Theme) -> Result<(), Error> {
        let mut settings = self.load().await;
        settings.theme = theme;
        self.save(&settings).await
    }
}

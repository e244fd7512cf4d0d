//! Chrome-backed implementations of the host traits, bridged through the
//! `host.js` module because the extension APIs (`chrome.tabs`,
//! `chrome.tabGroups`, `chrome.storage`) have no direct wasm bindings.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value, json};
use wasm_bindgen::prelude::*;

use crate::error::Error;
use crate::host::{GroupUpdate, KeyValueStore, TabHost};
use crate::tab_data::{Tab, TabGroup};

#[wasm_bindgen(module = "/host.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn queryTabs() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryTabGroups() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn groupTabs(tab_ids: JsValue, group_id: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn updateTabGroup(group_id: i32, props: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn ungroupTab(tab_id: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeTabs(tab_ids: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn activateTab(tab_id: i32, window_id: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn storageGet(area: &str, keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn storageSet(area: &str, entries: JsValue) -> Result<(), JsValue>;
}

/// Serialize as plain JSON-style JS objects (not ES maps) so the values can
/// be handed straight to the chrome.* APIs.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, String> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|err| err.to_string())
}

fn reason(err: JsValue) -> String {
    format!("{err:?}")
}

/// The real tab/group inventory.
pub struct ChromeTabs;

#[async_trait(?Send)]
impl TabHost for ChromeTabs {
    async fn query_tabs(&self) -> Result<Vec<Tab>, Error> {
        let tabs = queryTabs()
            .await
            .map_err(|err| Error::InventoryRead(reason(err)))?;
        serde_wasm_bindgen::from_value(tabs).map_err(|err| Error::InventoryRead(err.to_string()))
    }

    async fn query_groups(&self) -> Result<Vec<TabGroup>, Error> {
        let groups = queryTabGroups()
            .await
            .map_err(|err| Error::InventoryRead(reason(err)))?;
        serde_wasm_bindgen::from_value(groups).map_err(|err| Error::InventoryRead(err.to_string()))
    }

    async fn group_tabs(&self, tab_ids: &[i32], group: Option<i32>) -> Result<i32, Error> {
        let ids = to_js(&tab_ids).map_err(Error::GroupMutation)?;
        let target = match group {
            Some(id) => JsValue::from(id),
            None => JsValue::NULL,
        };
        let group_id = groupTabs(ids, target)
            .await
            .map_err(|err| Error::GroupMutation(reason(err)))?;
        group_id
            .as_f64()
            .map(|id| id as i32)
            .ok_or_else(|| Error::GroupMutation("group call returned a non-numeric id".to_string()))
    }

    async fn update_group(&self, group_id: i32, update: &GroupUpdate) -> Result<(), Error> {
        let mut props = Map::new();
        if let Some(title) = &update.title {
            props.insert("title".to_string(), json!(title));
        }
        if let Some(color) = update.color {
            props.insert("color".to_string(), json!(color.as_str()));
        }
        if let Some(collapsed) = update.collapsed {
            props.insert("collapsed".to_string(), json!(collapsed));
        }

        let props = to_js(&Value::Object(props)).map_err(Error::GroupMutation)?;
        updateTabGroup(group_id, props)
            .await
            .map_err(|err| Error::GroupMutation(reason(err)))
    }

    async fn ungroup_tab(&self, tab_id: i32) -> Result<(), Error> {
        ungroupTab(tab_id)
            .await
            .map_err(|err| Error::GroupMutation(reason(err)))
    }

    async fn remove_tabs(&self, tab_ids: &[i32]) -> Result<(), Error> {
        let ids = to_js(&tab_ids).map_err(Error::GroupMutation)?;
        removeTabs(ids)
            .await
            .map_err(|err| Error::GroupMutation(reason(err)))
    }

    async fn activate_tab(&self, tab_id: i32, window_id: i32) -> Result<(), Error> {
        activateTab(tab_id, window_id)
            .await
            .map_err(|err| Error::GroupMutation(reason(err)))
    }
}

/// One `chrome.storage` area.
pub struct ChromeStorage {
    area: &'static str,
}

impl ChromeStorage {
    /// The synced tier: settings, rules, theme.
    pub fn sync() -> ChromeStorage {
        ChromeStorage { area: "sync" }
    }

    /// The local tier: high-churn collapse flags, not worth syncing.
    pub fn local() -> ChromeStorage {
        ChromeStorage { area: "local" }
    }
}

#[async_trait(?Send)]
impl KeyValueStore for ChromeStorage {
    async fn read(&self, keys: &[&str]) -> Result<Map<String, Value>, Error> {
        let keys = to_js(&keys).map_err(Error::SettingsPersistence)?;
        let entries = storageGet(self.area, keys)
            .await
            .map_err(|err| Error::SettingsPersistence(reason(err)))?;
        serde_wasm_bindgen::from_value(entries)
            .map_err(|err| Error::SettingsPersistence(err.to_string()))
    }

    async fn write(&self, entries: Map<String, Value>) -> Result<(), Error> {
        let entries = to_js(&Value::Object(entries)).map_err(Error::SettingsPersistence)?;
        storageSet(self.area, entries)
            .await
            .map_err(|err| Error::SettingsPersistence(reason(err)))
    }
}

//! Popup-facing wasm API. The popup script constructs one `PopupSession`
//! when it opens and drives every action through it; rendering stays on the
//! JS side.
//!
//! Results and errors cross the boundary as plain JSON-shaped objects.
//! Errors always carry `{kind, message}` so the script can branch on the
//! failure kind (e.g. open settings on `classifier_not_configured`).

use std::rc::Rc;

use serde::Serialize;
use serde_json::json;
use wasm_bindgen::prelude::*;

use crate::chrome::{ChromeStorage, ChromeTabs};
use crate::classify::GroupingStrategy;
use crate::error::Error;
use crate::reconcile::{ApplyReport, CollapseSweep, UngroupReport};
use crate::rules::CustomRule;
use crate::session::Organizer;
use crate::settings::{Settings, Theme};

#[wasm_bindgen]
pub struct PopupSession {
    organizer: Organizer,
}

#[wasm_bindgen]
impl PopupSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> PopupSession {
        PopupSession {
            organizer: Organizer::new(
                Rc::new(ChromeTabs),
                Rc::new(ChromeStorage::sync()),
                Rc::new(ChromeStorage::local()),
            ),
        }
    }

    #[wasm_bindgen(js_name = groupByDomain)]
    pub async fn group_by_domain(&self) -> Result<JsValue, JsValue> {
        self.run_grouping(GroupingStrategy::Domain).await
    }

    #[wasm_bindgen(js_name = groupByAi)]
    pub async fn group_by_ai(&self) -> Result<JsValue, JsValue> {
        self.run_grouping(GroupingStrategy::Ai).await
    }

    #[wasm_bindgen(js_name = groupBySimilarity)]
    pub async fn group_by_similarity(&self) -> Result<JsValue, JsValue> {
        self.run_grouping(GroupingStrategy::Similarity).await
    }

    #[wasm_bindgen(js_name = groupByRules)]
    pub async fn group_by_rules(&self) -> Result<JsValue, JsValue> {
        self.run_grouping(GroupingStrategy::Rules).await
    }

    #[wasm_bindgen(js_name = ungroupAll)]
    pub async fn ungroup_all(&self) -> Result<JsValue, JsValue> {
        let report = self.organizer.ungroup_all().await.map_err(error_to_js)?;
        to_js(&ungroup_report_json(&report))
    }

    #[wasm_bindgen(js_name = collapseAll)]
    pub async fn collapse_all(&self) -> Result<JsValue, JsValue> {
        let sweep = self.organizer.collapse_all().await.map_err(error_to_js)?;
        to_js(&sweep_json(&sweep))
    }

    #[wasm_bindgen(js_name = expandAll)]
    pub async fn expand_all(&self) -> Result<JsValue, JsValue> {
        let sweep = self.organizer.expand_all().await.map_err(error_to_js)?;
        to_js(&sweep_json(&sweep))
    }

    #[wasm_bindgen(js_name = closeGroup)]
    pub async fn close_group(&self, group_key: String) -> Result<u32, JsValue> {
        let closed = self
            .organizer
            .close_group(&group_key)
            .await
            .map_err(error_to_js)?;
        Ok(closed as u32)
    }

    #[wasm_bindgen(js_name = setGroupCollapsed)]
    pub async fn set_group_collapsed(
        &self,
        group_key: String,
        collapsed: bool,
    ) -> Result<(), JsValue> {
        self.organizer
            .set_group_collapsed(&group_key, collapsed)
            .await
            .map_err(error_to_js)
    }

    #[wasm_bindgen(js_name = syncCollapsedStates)]
    pub async fn sync_collapsed_states(&self) -> Result<(), JsValue> {
        self.organizer
            .sync_collapsed_states()
            .await
            .map_err(error_to_js)
    }

    /// Render model for the popup: grouped sections first, then the
    /// synthetic ungrouped section.
    pub async fn overview(&self) -> Result<JsValue, JsValue> {
        let views = self.organizer.overview().await.map_err(error_to_js)?;
        to_js(&views)
    }

    #[wasm_bindgen(js_name = activateTab)]
    pub async fn activate_tab(&self, tab_id: i32, window_id: i32) -> Result<(), JsValue> {
        self.organizer
            .activate_tab(tab_id, window_id)
            .await
            .map_err(error_to_js)
    }

    #[wasm_bindgen(js_name = closeTab)]
    pub async fn close_tab(&self, tab_id: i32) -> Result<(), JsValue> {
        self.organizer.close_tab(tab_id).await.map_err(error_to_js)
    }

    #[wasm_bindgen(js_name = pruneSingletonGroups)]
    pub async fn prune_singleton_groups(&self) -> Result<JsValue, JsValue> {
        let detached = self
            .organizer
            .prune_singleton_groups()
            .await
            .map_err(error_to_js)?;
        to_js(&detached)
    }

    #[wasm_bindgen(js_name = noteTabActivated)]
    pub fn note_tab_activated(&self, tab_id: i32) {
        self.organizer.note_tab_activity(tab_id, js_sys::Date::now());
    }

    #[wasm_bindgen(js_name = lastTabActivity)]
    pub fn last_tab_activity(&self, tab_id: i32) -> Option<f64> {
        self.organizer.last_tab_activity(tab_id)
    }

    #[wasm_bindgen(js_name = loadSettings)]
    pub async fn load_settings(&self) -> Result<JsValue, JsValue> {
        let settings = self.organizer.settings_manager().load().await;
        to_js(&settings)
    }

    #[wasm_bindgen(js_name = saveSettings)]
    pub async fn save_settings(&self, settings: JsValue) -> Result<(), JsValue> {
        let settings: Settings = serde_wasm_bindgen::from_value(settings)
            .map_err(|err| error_to_js(Error::SettingsPersistence(err.to_string())))?;
        self.organizer
            .settings_manager()
            .save(&settings)
            .await
            .map_err(error_to_js)
    }

    #[wasm_bindgen(js_name = currentTheme)]
    pub async fn current_theme(&self) -> Result<JsValue, JsValue> {
        to_js(&self.organizer.settings_manager().theme().await)
    }

    #[wasm_bindgen(js_name = saveTheme)]
    pub async fn save_theme(&self, theme: JsValue) -> Result<(), JsValue> {
        let theme: Theme = serde_wasm_bindgen::from_value(theme)
            .map_err(|err| error_to_js(Error::SettingsPersistence(err.to_string())))?;
        self.organizer
            .settings_manager()
            .save_theme(theme)
            .await
            .map_err(error_to_js)
    }

    #[wasm_bindgen(js_name = customRules)]
    pub async fn custom_rules(&self) -> Result<JsValue, JsValue> {
        to_js(&self.organizer.settings_manager().custom_rules().await)
    }

    #[wasm_bindgen(js_name = saveCustomRules)]
    pub async fn save_custom_rules(&self, rules: JsValue) -> Result<(), JsValue> {
        let rules: Vec<CustomRule> = serde_wasm_bindgen::from_value(rules)
            .map_err(|err| error_to_js(Error::SettingsPersistence(err.to_string())))?;
        self.organizer
            .settings_manager()
            .save_custom_rules(&rules)
            .await
            .map_err(error_to_js)
    }
}

impl PopupSession {
    async fn run_grouping(&self, strategy: GroupingStrategy) -> Result<JsValue, JsValue> {
        let report = self
            .organizer
            .run_grouping(strategy)
            .await
            .map_err(error_to_js)?;
        to_js(&apply_report_json(&report))
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|err| JsValue::from_str(&err.to_string()))
}

fn error_to_js(err: Error) -> JsValue {
    let payload = json!({ "kind": err.kind(), "message": err.to_string() });
    to_js(&payload).unwrap_or_else(|_| JsValue::from_str(&err.to_string()))
}

fn apply_report_json(report: &ApplyReport) -> serde_json::Value {
    json!({
        "created": report.created(),
        "buckets": report
            .outcomes
            .iter()
            .map(|outcome| {
                json!({
                    "key": outcome.key,
                    "groupId": outcome.group_id,
                    "error": outcome.error.as_ref().map(|err| err.to_string()),
                })
            })
            .collect::<Vec<_>>(),
    })
}

fn ungroup_report_json(report: &UngroupReport) -> serde_json::Value {
    json!({
        "detached": report.detached,
        "failures": report
            .failures
            .iter()
            .map(|(tab_id, err)| json!({ "tabId": tab_id, "error": err.to_string() }))
            .collect::<Vec<_>>(),
    })
}

fn sweep_json(sweep: &CollapseSweep) -> serde_json::Value {
    json!({
        "collapsed": sweep.collapsed,
        "groupKeys": sweep.group_keys,
        "includesUngrouped": sweep.includes_ungrouped,
    })
}

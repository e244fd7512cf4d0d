//! One popup session's worth of state and operations.
//!
//! The `Organizer` owns its collaborators (settings manager, collapse store,
//! classify engine, activity log) for the lifetime of one popup invocation;
//! nothing lives in module-level state. Tab and group snapshots are read
//! fresh from the host on every run.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;

use crate::ai::{ChatCompletionClassifier, TabClassifier};
use crate::classify::{ClassifyEngine, GroupingStrategy};
use crate::collapse::CollapseStore;
use crate::error::Error;
use crate::host::{GroupUpdate, KeyValueStore, TabHost};
use crate::reconcile::{ApplyReport, CollapseSweep, Reconciler, UngroupReport};
use crate::settings::{Settings, SettingsManager};
use crate::tab_data::{GroupColor, Tab, UNGROUPED_KEY};

/// Last-activation timestamps keyed by tab id, owned by the session instead
/// of ambient module state. Timestamps are supplied by the caller.
#[derive(Debug, Default)]
pub struct ActivityLog {
    last_seen: HashMap<i32, f64>,
}

impl ActivityLog {
    pub fn note(&mut self, tab_id: i32, at_ms: f64) {
        self.last_seen.insert(tab_id, at_ms);
    }

    pub fn last_seen(&self, tab_id: i32) -> Option<f64> {
        self.last_seen.get(&tab_id).copied()
    }

    pub fn forget(&mut self, tab_id: i32) {
        self.last_seen.remove(&tab_id);
    }
}

/// Render model for one section of the popup: a real group, or the trailing
/// synthetic ungrouped section (`key == "ungrouped"`, no color).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub key: String,
    pub title: String,
    pub color: Option<GroupColor>,
    pub collapsed: bool,
    pub tabs: Vec<Tab>,
}

pub struct Organizer {
    host: Rc<dyn TabHost>,
    settings: SettingsManager,
    collapse: CollapseStore,
    engine: ClassifyEngine,
    activity: RefCell<ActivityLog>,
}

impl Organizer {
    pub fn new(
        host: Rc<dyn TabHost>,
        sync_store: Rc<dyn KeyValueStore>,
        local_store: Rc<dyn KeyValueStore>,
    ) -> Organizer {
        Organizer {
            host,
            settings: SettingsManager::new(sync_store),
            collapse: CollapseStore::new(local_store),
            engine: ClassifyEngine::new(),
            activity: RefCell::new(ActivityLog::default()),
        }
    }

    /// Classify the current snapshot with `strategy` and reconcile the
    /// result. For AI mode this builds the configured chat-completion
    /// classifier; the configuration check happens before any tab query or
    /// network traffic so the popup can redirect to settings immediately.
    pub async fn run_grouping(&self, strategy: GroupingStrategy) -> Result<ApplyReport, Error> {
        let settings = self.settings.load().await;

        let classifier = if strategy == GroupingStrategy::Ai {
            if !settings.classifier_configured() {
                return Err(Error::ClassifierNotConfigured);
            }
            Some(ChatCompletionClassifier::new(
                settings.api_url.clone(),
                settings.api_key.clone(),
            ))
        } else {
            None
        };

        self.run_grouping_with(
            strategy,
            &settings,
            classifier.as_ref().map(|c| c as &dyn TabClassifier),
        )
        .await
    }

    /// Same run, with the classifier injected. Split out so tests (and any
    /// alternative classifier backend) can drive the full pipeline.
    pub async fn run_grouping_with(
        &self,
        strategy: GroupingStrategy,
        settings: &Settings,
        classifier: Option<&dyn TabClassifier>,
    ) -> Result<ApplyReport, Error> {
        let tabs = self.host.query_tabs().await?;
        let classification = self
            .engine
            .classify(strategy, &tabs, &settings.custom_groups, classifier)
            .await?;

        if classification.is_empty() {
            log::info!("no bucket reached two tabs, nothing to group");
            return Ok(ApplyReport::default());
        }

        let reconciler = Reconciler::new(self.host.as_ref());
        let report = reconciler.apply(&classification).await?;
        log::info!(
            "grouping done: {} of {} buckets materialized",
            report.created(),
            classification.len()
        );
        Ok(report)
    }

    pub async fn ungroup_all(&self) -> Result<UngroupReport, Error> {
        Reconciler::new(self.host.as_ref()).ungroup_all().await
    }

    /// Detach the sole member of any real single-tab group.
    pub async fn prune_singleton_groups(&self) -> Result<Vec<i32>, Error> {
        Reconciler::new(self.host.as_ref()).prune_singletons().await
    }

    pub async fn collapse_all(&self) -> Result<CollapseSweep, Error> {
        Reconciler::new(self.host.as_ref())
            .collapse_all(&self.collapse)
            .await
    }

    pub async fn expand_all(&self) -> Result<CollapseSweep, Error> {
        Reconciler::new(self.host.as_ref())
            .expand_all(&self.collapse)
            .await
    }

    /// Close every tab of the group behind a view key. The synthetic
    /// ungrouped key is rejected as a no-op.
    pub async fn close_group(&self, key: &str) -> Result<usize, Error> {
        if key == UNGROUPED_KEY {
            log::debug!("close_group called for the ungrouped section, ignoring");
            return Ok(0);
        }
        let group_id = parse_group_key(key)?;
        Reconciler::new(self.host.as_ref()).close_group(group_id).await
    }

    /// Toggle one section's collapsed flag. Real groups get the host update
    /// plus the durable mirror; the ungrouped pseudo-group is store-only.
    pub async fn set_group_collapsed(&self, key: &str, collapsed: bool) -> Result<(), Error> {
        if key != UNGROUPED_KEY {
            let group_id = parse_group_key(key)?;
            self.host
                .update_group(group_id, &GroupUpdate::collapsed(collapsed))
                .await?;
        }
        self.collapse.set(key, collapsed).await
    }

    /// Push stored collapse flags onto the live groups at popup open, so the
    /// browser mirrors what the popup is about to render. Groups without a
    /// stored entry are left alone (lazy seeding covers them later).
    pub async fn sync_collapsed_states(&self) -> Result<(), Error> {
        let stored = self.collapse.get_all().await?;
        let groups = self.host.query_groups().await?;

        for group in &groups {
            let Some(&collapsed) = stored.get(&group.id.to_string()) else {
                continue;
            };
            if collapsed == group.collapsed {
                continue;
            }
            if let Err(err) = self
                .host
                .update_group(group.id, &GroupUpdate::collapsed(collapsed))
                .await
            {
                log::warn!("failed to sync collapsed state onto group {}: {err}", group.id);
            }
        }
        Ok(())
    }

    /// Assemble the popup's render model: grouped sections in first-tab
    /// order, then the ungrouped section when any loose tabs exist.
    pub async fn overview(&self) -> Result<Vec<GroupView>, Error> {
        let tabs = self.host.query_tabs().await?;
        let groups = self.host.query_groups().await?;

        let mut order: Vec<i32> = Vec::new();
        let mut grouped: HashMap<i32, Vec<Tab>> = HashMap::new();
        let mut ungrouped: Vec<Tab> = Vec::new();

        for tab in tabs {
            if tab.is_grouped() {
                if !grouped.contains_key(&tab.group_id) {
                    order.push(tab.group_id);
                }
                grouped.entry(tab.group_id).or_default().push(tab);
            } else {
                ungrouped.push(tab);
            }
        }

        let mut views = Vec::new();
        for group_id in order {
            // Tabs can reference a group the group query no longer knows;
            // those tabs are simply not renderable as a section.
            let Some(group) = groups.iter().find(|group| group.id == group_id) else {
                continue;
            };
            let key = group_id.to_string();
            let collapsed = match self.collapse.get(&key, group.collapsed).await {
                Ok(collapsed) => collapsed,
                Err(err) => {
                    log::warn!("collapse lookup failed for group {key}: {err}");
                    group.collapsed
                }
            };
            views.push(GroupView {
                key,
                title: group.title.clone(),
                color: Some(group.color),
                collapsed,
                tabs: grouped.remove(&group_id).unwrap_or_default(),
            });
        }

        if !ungrouped.is_empty() {
            let collapsed = match self.collapse.get(UNGROUPED_KEY, false).await {
                Ok(collapsed) => collapsed,
                Err(err) => {
                    log::warn!("collapse lookup failed for ungrouped section: {err}");
                    false
                }
            };
            views.push(GroupView {
                key: UNGROUPED_KEY.to_string(),
                title: "Ungrouped Tabs".to_string(),
                color: None,
                collapsed,
                tabs: ungrouped,
            });
        }

        Ok(views)
    }

    pub async fn activate_tab(&self, tab_id: i32, window_id: i32) -> Result<(), Error> {
        self.host.activate_tab(tab_id, window_id).await
    }

    pub async fn close_tab(&self, tab_id: i32) -> Result<(), Error> {
        self.host.remove_tabs(&[tab_id]).await?;
        self.activity.borrow_mut().forget(tab_id);
        Ok(())
    }

    pub fn note_tab_activity(&self, tab_id: i32, at_ms: f64) {
        self.activity.borrow_mut().note(tab_id, at_ms);
    }

    pub fn last_tab_activity(&self, tab_id: i32) -> Option<f64> {
        self.activity.borrow().last_seen(tab_id)
    }

    pub fn settings_manager(&self) -> &SettingsManager {
        &self.settings
    }
}

fn parse_group_key(key: &str) -> Result<i32, Error> {
    key.parse::<i32>()
        .map_err(|_| Error::GroupMutation(format!("not a group key: {key}")))
}

//! Reconciliation: turn a desired bucket assignment into concrete mutations
//! against the live, possibly-stale tab inventory.
//!
//! Nothing here is transactional. Each bucket, tab or group is mutated with
//! its own call and its own failure; a tab closed mid-run makes that one
//! call fail softly while the rest of the batch proceeds.

use crate::classify::Classification;
use crate::collapse::CollapseStore;
use crate::error::Error;
use crate::host::{GroupUpdate, TabHost};
use crate::tab_data::{TAB_GROUP_ID_NONE, TabGroup, UNGROUPED_KEY};

/// What happened to one classification bucket.
///
/// `group_id` is set as soon as the group exists, even when labeling it
/// afterwards failed — creation is not rolled back, the partial failure is
/// reported instead.
#[derive(Debug)]
pub struct BucketOutcome {
    pub key: String,
    pub group_id: Option<i32>,
    pub error: Option<Error>,
}

/// Per-bucket results of applying a classification.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub outcomes: Vec<BucketOutcome>,
}

impl ApplyReport {
    pub fn created(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.group_id.is_some() && outcome.error.is_none())
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &BucketOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.error.is_some())
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Per-tab results of detaching every grouped tab.
#[derive(Debug, Default)]
pub struct UngroupReport {
    pub detached: Vec<i32>,
    pub failures: Vec<(i32, Error)>,
}

/// Result of a collapse-all / expand-all sweep: which group keys changed,
/// so the popup can update its view incrementally instead of re-querying.
#[derive(Debug, PartialEq)]
pub struct CollapseSweep {
    pub collapsed: bool,
    pub group_keys: Vec<String>,
    pub includes_ungrouped: bool,
}

pub struct Reconciler<'h> {
    host: &'h dyn TabHost,
}

impl<'h> Reconciler<'h> {
    pub fn new(host: &'h dyn TabHost) -> Reconciler<'h> {
        Reconciler { host }
    }

    /// Materialize every bucket as a real group.
    ///
    /// When exactly one live group already carries the bucket's title, tabs
    /// are attached to it instead of a second same-named group being created.
    /// Group creation and labeling are separate host calls; a labeling
    /// failure leaves an unlabeled group behind and is reported per bucket.
    pub async fn apply(&self, classification: &Classification) -> Result<ApplyReport, Error> {
        let live_groups = self.host.query_groups().await?;
        let mut report = ApplyReport::default();

        for (key, bucket) in classification.iter() {
            let tab_ids: Vec<i32> = bucket.tabs.iter().map(|tab| tab.id).collect();
            let target = single_group_titled(&live_groups, &bucket.title);

            let mut outcome = BucketOutcome {
                key: key.clone(),
                group_id: None,
                error: None,
            };

            match self.host.group_tabs(&tab_ids, target).await {
                Ok(group_id) => {
                    outcome.group_id = Some(group_id);
                    let update = GroupUpdate {
                        title: Some(bucket.title.clone()),
                        color: Some(bucket.color),
                        collapsed: Some(false),
                    };
                    if let Err(err) = self.host.update_group(group_id, &update).await {
                        log::warn!("group {} exists but labeling failed: {err}", bucket.title);
                        outcome.error = Some(err);
                    }
                }
                Err(err) => {
                    log::warn!("failed to group tabs for {}: {err}", bucket.title);
                    outcome.error = Some(err);
                }
            }

            report.outcomes.push(outcome);
        }

        Ok(report)
    }

    /// Detach every grouped tab, one call per tab. Failures are collected,
    /// not propagated, so one stale tab id cannot abort the sweep.
    pub async fn ungroup_all(&self) -> Result<UngroupReport, Error> {
        let tabs = self.host.query_tabs().await?;
        let mut report = UngroupReport::default();

        for tab in tabs.iter().filter(|tab| tab.is_grouped()) {
            match self.host.ungroup_tab(tab.id).await {
                Ok(()) => report.detached.push(tab.id),
                Err(err) => {
                    log::warn!("failed to ungroup tab {}: {err}", tab.id);
                    report.failures.push((tab.id, err));
                }
            }
        }

        Ok(report)
    }

    pub async fn collapse_all(&self, store: &CollapseStore) -> Result<CollapseSweep, Error> {
        self.set_all_collapsed(store, true).await
    }

    pub async fn expand_all(&self, store: &CollapseStore) -> Result<CollapseSweep, Error> {
        self.set_all_collapsed(store, false).await
    }

    /// Push one collapsed value onto every live group and mirror it into the
    /// collapse store (ungrouped pseudo-group included). Host failures skip
    /// that group; the store write covers the groups that actually changed.
    async fn set_all_collapsed(
        &self,
        store: &CollapseStore,
        collapsed: bool,
    ) -> Result<CollapseSweep, Error> {
        let groups = self.host.query_groups().await?;
        let mut group_keys = Vec::new();

        for group in &groups {
            let update = GroupUpdate::collapsed(collapsed);
            match self.host.update_group(group.id, &update).await {
                Ok(()) => group_keys.push(group.id.to_string()),
                Err(err) => {
                    log::warn!("failed to set collapsed={collapsed} on group {}: {err}", group.id);
                }
            }
        }

        let mut stored_keys = group_keys.clone();
        stored_keys.push(UNGROUPED_KEY.to_string());
        store.set_many(&stored_keys, collapsed).await?;

        Ok(CollapseSweep {
            collapsed,
            group_keys,
            includes_ungrouped: true,
        })
    }

    /// Close every tab in one group. The synthetic ungrouped section has no
    /// host group to resolve, so the sentinel is rejected as a no-op.
    pub async fn close_group(&self, group_id: i32) -> Result<usize, Error> {
        if group_id == TAB_GROUP_ID_NONE {
            log::debug!("refusing to close the synthetic ungrouped section");
            return Ok(0);
        }

        let tabs = self.host.query_tabs().await?;
        let tab_ids: Vec<i32> = tabs
            .iter()
            .filter(|tab| tab.group_id == group_id)
            .map(|tab| tab.id)
            .collect();
        if tab_ids.is_empty() {
            return Ok(0);
        }

        self.host.remove_tabs(&tab_ids).await?;
        Ok(tab_ids.len())
    }

    /// Detach the sole member of any real single-tab group. Keeps the
    /// inventory aligned with the no-singleton-groups rule after the user
    /// (or a stale snapshot) whittles a group down to one tab.
    pub async fn prune_singletons(&self) -> Result<Vec<i32>, Error> {
        let tabs = self.host.query_tabs().await?;
        let mut members: std::collections::BTreeMap<i32, Vec<i32>> = std::collections::BTreeMap::new();
        for tab in &tabs {
            if tab.is_grouped() {
                members.entry(tab.group_id).or_default().push(tab.id);
            }
        }

        let mut detached = Vec::new();
        for (group_id, tab_ids) in members {
            if tab_ids.len() != 1 {
                continue;
            }
            match self.host.ungroup_tab(tab_ids[0]).await {
                Ok(()) => detached.push(tab_ids[0]),
                Err(err) => {
                    log::warn!("failed to prune singleton group {group_id}: {err}");
                }
            }
        }
        Ok(detached)
    }
}

fn single_group_titled(groups: &[TabGroup], title: &str) -> Option<i32> {
    let mut matching = groups.iter().filter(|group| group.title == title);
    match (matching.next(), matching.next()) {
        (Some(group), None) => Some(group.id),
        _ => None,
    }
}

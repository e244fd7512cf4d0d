//! Host-boundary traits: everything the browser owns sits behind these.
//!
//! All operations are async because every host call suspends until the
//! browser responds; there is no synchronous access to live tab state.
//! Implementations for the real extension runtime live in `chrome.rs`;
//! tests drive the same traits with in-memory mocks.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Error;
use crate::tab_data::{GroupColor, Tab, TabGroup};

/// Mutation payload for a tab group. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupUpdate {
    pub title: Option<String>,
    pub color: Option<GroupColor>,
    pub collapsed: Option<bool>,
}

impl GroupUpdate {
    pub fn collapsed(collapsed: bool) -> GroupUpdate {
        GroupUpdate {
            collapsed: Some(collapsed),
            ..GroupUpdate::default()
        }
    }
}

/// The live tab/group inventory.
///
/// Reads are best-effort snapshots; writes are per-item commands with
/// independent failure handling, never transactions.
#[async_trait(?Send)]
pub trait TabHost {
    async fn query_tabs(&self) -> Result<Vec<Tab>, Error>;

    async fn query_groups(&self) -> Result<Vec<TabGroup>, Error>;

    /// Attach `tab_ids` to `group` when given, else create a new group.
    /// Returns the id of the group the tabs landed in.
    async fn group_tabs(&self, tab_ids: &[i32], group: Option<i32>) -> Result<i32, Error>;

    async fn update_group(&self, group_id: i32, update: &GroupUpdate) -> Result<(), Error>;

    async fn ungroup_tab(&self, tab_id: i32) -> Result<(), Error>;

    async fn remove_tabs(&self, tab_ids: &[i32]) -> Result<(), Error>;

    async fn activate_tab(&self, tab_id: i32, window_id: i32) -> Result<(), Error>;
}

/// One durable key-value tier (the browser exposes a synced one for settings
/// and a local one for high-churn state like collapse flags).
#[async_trait(?Send)]
pub trait KeyValueStore {
    /// Read the requested top-level keys; absent keys are simply missing
    /// from the returned object.
    async fn read(&self, keys: &[&str]) -> Result<Map<String, Value>, Error>;

    /// Merge `entries` into the store.
    async fn write(&self, entries: Map<String, Value>) -> Result<(), Error>;
}

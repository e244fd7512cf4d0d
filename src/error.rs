//! Failure taxonomy shared across the crate.
//!
//! Every host-boundary failure is converted into one of these variants at
//! the edge where it happens; the popup script branches on `kind()` tags
//! (e.g. redirecting to settings on `classifier_not_configured`).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The browser query for tabs or groups failed; the whole operation aborts.
    #[error("failed to read the tab inventory: {0}")]
    InventoryRead(String),

    /// A tab URL could not be parsed. Only ever logged: the tab is skipped
    /// for domain bucketing and stays ungrouped.
    #[error("tab URL could not be parsed: {0}")]
    InvalidUrl(String),

    /// One create/update/ungroup/remove call failed. Reported per item,
    /// sibling operations in the same batch continue.
    #[error("group mutation failed: {0}")]
    GroupMutation(String),

    /// AI grouping was requested without an API key configured.
    #[error("no classifier API key configured")]
    ClassifierNotConfigured,

    /// The classifier endpoint was unreachable or returned a non-success status.
    #[error("classifier request failed: {0}")]
    ClassifierRequest(String),

    /// The classifier responded, but the content was not the expected shape.
    #[error("classifier response could not be parsed: {0}")]
    ClassifierResponse(String),

    /// A durable settings read or write failed.
    #[error("settings persistence failed: {0}")]
    SettingsPersistence(String),
}

impl Error {
    /// Stable machine tag for the popup script.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InventoryRead(_) => "inventory_read_failed",
            Error::InvalidUrl(_) => "invalid_url",
            Error::GroupMutation(_) => "group_mutation_failed",
            Error::ClassifierNotConfigured => "classifier_not_configured",
            Error::ClassifierRequest(_) => "classifier_request_failed",
            Error::ClassifierResponse(_) => "classifier_response_invalid",
            Error::SettingsPersistence(_) => "settings_persistence_failed",
        }
    }
}

//! Target-level errors raised while syncing a grid or a show.

use crate::models::ShowId;

/// Aborts one target (the grid, or one show) and nothing else.
///
/// Field-level problems are not errors at this level; see
/// [`FieldError`](crate::episode::FieldError).
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Network or HTTP failure while fetching a document.
    #[error("fetch failed for {address}: {reason}")]
    Fetch { address: String, reason: String },

    /// Episode detail requested for a show that was never placed on the grid.
    #[error("show {0} has no grid placement")]
    MissingPrerequisite(ShowId),

    /// A document lacks a structure the extractor relies on.
    #[error("malformed document {address}: {reason}")]
    MalformedDocument { address: String, reason: String },
}

impl SyncError {
    pub fn malformed(address: &str, reason: impl Into<String>) -> Self {
        SyncError::MalformedDocument {
            address: address.to_string(),
            reason: reason.into(),
        }
    }
}

//! Optimistic-concurrency retry for update dispatch
//!
//! Every update carries the version token of the resource it was computed
//! against. When another writer got there first the catalog answers with a
//! conflict, and the update is re-driven against fresh state:
//!
//! ```text
//! Dispatching --ok--------------------------------> Done
//! Dispatching --conflict--> Retrying --ok---------> Done
//!                           Retrying --conflict---> Retrying (up to the ceiling)
//!                           Retrying --ceiling----> Failed
//! any state   --other error-----------------------> Failed
//! ```
//!
//! The decision of what to do with a failed dispatch is [`decide`], a pure
//! function over the discriminated [`RemoteError`].

use super::diff::{DiffEngine, UpdateAction};
use super::options::SyncOptions;
use crate::error::{RemoteError, SyncError};
use crate::model::{ExistingResource, ResourceDraft};
use crate::transport::CatalogClient;
use std::sync::Arc;

pub const MAX_CONFLICT_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-fetch, re-diff and dispatch again
    Retry,
    /// Conflicts persisted past the ceiling
    GiveUp,
    /// Permanent failure, never retried
    Fail,
}

/// What to do after a dispatch failed with `error`, given how many retries
/// were already spent on this draft
pub fn decide(error: &RemoteError, retries_used: u32, max_retries: u32) -> RetryDecision {
    match error {
        RemoteError::Conflict { .. } if retries_used < max_retries => RetryDecision::Retry,
        RemoteError::Conflict { .. } => RetryDecision::GiveUp,
        _ => RetryDecision::Fail,
    }
}

/// Terminal state of one dispatched update
#[derive(Debug)]
pub enum UpdateOutcome {
    Updated {
        resource: ExistingResource,
        retries: u32,
    },
    /// A retry found the fresh state already matching the draft; nothing
    /// was written on its behalf
    Converged { retries: u32 },
    /// The update callback dropped every recomputed action
    Suppressed { retries: u32 },
    Failed { message: String, cause: SyncError },
}

pub struct ConflictRetryCoordinator {
    client: Arc<dyn CatalogClient>,
    diff: Arc<dyn DiffEngine>,
    options: Arc<SyncOptions>,
}

impl ConflictRetryCoordinator {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        diff: Arc<dyn DiffEngine>,
        options: Arc<SyncOptions>,
    ) -> Self {
        Self {
            client,
            diff,
            options,
        }
    }

    /// Dispatch `actions` against `existing` until it lands or fails for good
    pub async fn update(
        &self,
        existing: ExistingResource,
        draft: &ResourceDraft,
        actions: Vec<UpdateAction>,
    ) -> UpdateOutcome {
        let key = draft.effective_key().unwrap_or_default().to_string();
        let max_retries = self.options.max_conflict_retries();
        let mut current = existing;
        let mut actions = actions;
        let mut retries = 0;

        loop {
            tracing::debug!(
                "Updating {} '{}' at version {} with {} action(s)",
                current.resource_type,
                key,
                current.version,
                actions.len()
            );

            let err = match self.client.update(&current, &actions).await {
                Ok(resource) => return UpdateOutcome::Updated { resource, retries },
                Err(err) => err,
            };

            match decide(&err, retries, max_retries) {
                RetryDecision::Fail => {
                    return UpdateOutcome::Failed {
                        message: format!(
                            "Failed to update {} with key: '{}'. Reason: {}",
                            draft.resource_type, key, err
                        ),
                        cause: err.into(),
                    };
                }
                RetryDecision::GiveUp => {
                    return UpdateOutcome::Failed {
                        message: format!(
                            "Failed to update {} with key: '{}'. Reason: conflicts persisted after {} retries: {}",
                            draft.resource_type, key, retries, err
                        ),
                        cause: err.into(),
                    };
                }
                RetryDecision::Retry => {
                    retries += 1;
                    tracing::warn!(
                        "Concurrent modification of {} '{}', retrying ({}/{})",
                        draft.resource_type,
                        key,
                        retries,
                        max_retries
                    );
                }
            }

            let fresh = match self.client.find(draft.resource_type, &key).await {
                Ok(Some(fresh)) => fresh,
                Ok(None) => {
                    return UpdateOutcome::Failed {
                        message: format!(
                            "Failed to update {} with key: '{}'. Reason: Not found when attempting to fetch while retrying after concurrency modification.",
                            draft.resource_type, key
                        ),
                        cause: RemoteError::NotFound {
                            resource_type: draft.resource_type,
                            key,
                        }
                        .into(),
                    };
                }
                Err(fetch_err) => {
                    return UpdateOutcome::Failed {
                        message: format!(
                            "Failed to fetch {} with key: '{}' while retrying after concurrency modification. Reason: {}",
                            draft.resource_type, key, fetch_err
                        ),
                        cause: fetch_err.into(),
                    };
                }
            };

            let recomputed = self.diff.diff(&fresh, draft);
            if recomputed.is_empty() {
                tracing::debug!("{} '{}' already matches the draft", draft.resource_type, key);
                return UpdateOutcome::Converged { retries };
            }
            let recomputed = self.options.before_update(recomputed, draft, &fresh);
            if recomputed.is_empty() {
                return UpdateOutcome::Suppressed { retries };
            }

            current = fresh;
            actions = recomputed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceType;

    fn conflict() -> RemoteError {
        RemoteError::Conflict {
            resource_type: ResourceType::Products,
            key: "p1".to_string(),
            expected: 1,
            actual: 2,
        }
    }

    #[test]
    fn test_conflict_retried_until_ceiling() {
        assert_eq!(decide(&conflict(), 0, 3), RetryDecision::Retry);
        assert_eq!(decide(&conflict(), 2, 3), RetryDecision::Retry);
        assert_eq!(decide(&conflict(), 3, 3), RetryDecision::GiveUp);
        assert_eq!(decide(&conflict(), 0, 0), RetryDecision::GiveUp);
    }

    #[test]
    fn test_permanent_errors_never_retried() {
        let duplicate = RemoteError::duplicate_field("slug", &serde_json::json!("a"), "p2");
        assert_eq!(decide(&duplicate, 0, 3), RetryDecision::Fail);

        let transport = RemoteError::Transport {
            message: "connection reset".to_string(),
        };
        assert_eq!(decide(&transport, 0, 3), RetryDecision::Fail);
    }
}

pub mod diff;
pub mod options;
pub mod retry;
pub mod stats;
pub mod validate;

use crate::error::{ReferenceError, SyncError};
use crate::model::{ResourceDraft, ResourceType};
use crate::resolve::{ReferenceCache, ReferenceResolver};
use crate::transport::CatalogClient;
use diff::DiffEngine;
use futures::future::join_all;
use options::SyncOptions;
use retry::{ConflictRetryCoordinator, UpdateOutcome};
use stats::SyncStatistics;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Reconciles batches of drafts against a catalog
///
/// One engine is one sync run: calls to [`SyncEngine::sync`] share the
/// reference cache and accumulate into the same statistics. Chain calls
/// with `.await` when a later batch depends on resources an earlier one
/// creates.
pub struct SyncEngine {
    client: Arc<dyn CatalogClient>,
    diff: Arc<dyn DiffEngine>,
    options: Arc<SyncOptions>,
    resolver: ReferenceResolver,
    retry: ConflictRetryCoordinator,
    statistics: Arc<SyncStatistics>,
}

impl SyncEngine {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        diff: Arc<dyn DiffEngine>,
        options: SyncOptions,
    ) -> Self {
        let cache = Arc::new(ReferenceCache::new(options.cache_size()));
        Self::with_cache(client, diff, options, cache)
    }

    /// Use a caller-owned, possibly pre-seeded, reference cache
    pub fn with_cache(
        client: Arc<dyn CatalogClient>,
        diff: Arc<dyn DiffEngine>,
        options: SyncOptions,
        cache: Arc<ReferenceCache>,
    ) -> Self {
        let options = Arc::new(options);
        let statistics = Arc::new(SyncStatistics::new(options.resource_label()));
        let retry = ConflictRetryCoordinator::new(client.clone(), diff.clone(), options.clone());

        Self {
            client,
            diff,
            options,
            resolver: ReferenceResolver::new(cache),
            retry,
            statistics,
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    pub fn statistics(&self) -> &Arc<SyncStatistics> {
        &self.statistics
    }

    /// Sync one batch of drafts; `None` entries are null drafts
    ///
    /// Per-draft failures never fail the call: they are counted and handed
    /// to the error callback. The returned statistics are cumulative over
    /// every call made on this engine.
    pub async fn sync(&self, drafts: Vec<Option<ResourceDraft>>) -> Arc<SyncStatistics> {
        let start = Instant::now();
        tracing::info!("Starting sync of {} draft(s)", drafts.len());
        self.statistics.increment_processed(drafts.len());

        let mut valid = Vec::with_capacity(drafts.len());
        for draft in &drafts {
            match validate::validate(draft.as_ref()) {
                Ok(draft) => valid.push(draft),
                Err(err) => {
                    self.options.report_error(&err.to_string(), None);
                    self.statistics.increment_failed();
                }
            }
        }

        let resolution = self.resolver.resolve_all(valid);
        if let Some(err) = resolution.error {
            self.report_reference_failures(err);
        }
        let resolved = resolution.drafts;

        let batch_size = self.options.batch_size();
        for (index, window) in resolved.chunks(batch_size).enumerate() {
            tracing::debug!(
                "Processing window {} ({} draft(s))",
                index + 1,
                window.len()
            );
            self.log_duplicate_keys(window);
            join_all(window.iter().map(|draft| self.sync_draft(draft))).await;
        }

        self.statistics.add_processing_time(start.elapsed());
        tracing::info!("{}", self.statistics.report());
        self.statistics.clone()
    }

    /// Report each draft named by an aggregate replacement error
    fn report_reference_failures(&self, err: ReferenceError) {
        let causes = match err {
            ReferenceError::ReferenceReplacement { causes } => causes,
            other => vec![other],
        };
        for cause in causes {
            let details: Vec<String> = match &cause {
                ReferenceError::InvalidResource { causes, .. } => {
                    causes.iter().map(ToString::to_string).collect()
                }
                _ => Vec::new(),
            };
            let message = if details.is_empty() {
                cause.to_string()
            } else {
                format!("{} {}", cause, details.join(" "))
            };
            self.options
                .report_error(&message, Some(&SyncError::Reference(cause)));
            self.statistics.increment_failed();
        }
    }

    /// Same-key drafts race on purpose; their updates converge through
    /// conflict retries
    fn log_duplicate_keys(&self, window: &[ResourceDraft]) {
        let mut seen: BTreeMap<(ResourceType, &str), usize> = BTreeMap::new();
        for draft in window {
            if let Some(key) = draft.effective_key() {
                *seen.entry((draft.resource_type, key)).or_default() += 1;
            }
        }
        for ((resource_type, key), count) in seen {
            if count > 1 {
                tracing::debug!(
                    "{} drafts in the same window share the {} key '{}'",
                    count,
                    resource_type,
                    key
                );
            }
        }
    }

    async fn sync_draft(&self, draft: &ResourceDraft) {
        let key = draft.effective_key().unwrap_or_default();

        let existing = match self.client.find(draft.resource_type, key).await {
            Ok(existing) => existing,
            Err(err) => {
                self.fail(
                    format!(
                        "Failed to fetch existing {} with key: '{}'. Reason: {}",
                        draft.resource_type, key, err
                    ),
                    err.into(),
                );
                return;
            }
        };

        match existing {
            None => self.create(draft, key).await,
            Some(existing) => {
                let actions = self.diff.diff(&existing, draft);
                if actions.is_empty() {
                    tracing::debug!("{} '{}' is up to date", draft.resource_type, key);
                    return;
                }

                let actions = self.options.before_update(actions, draft, &existing);
                if actions.is_empty() {
                    tracing::debug!(
                        "Update of {} '{}' suppressed by callback",
                        draft.resource_type,
                        key
                    );
                    return;
                }

                match self.retry.update(existing, draft, actions).await {
                    UpdateOutcome::Updated { resource, retries } => {
                        tracing::debug!(
                            "Updated {} '{}' to version {} after {} retries",
                            draft.resource_type,
                            key,
                            resource.version,
                            retries
                        );
                        self.statistics.increment_updated();
                    }
                    UpdateOutcome::Converged { retries } => {
                        tracing::debug!(
                            "{} '{}' converged after {} retries, nothing left to update",
                            draft.resource_type,
                            key,
                            retries
                        );
                    }
                    UpdateOutcome::Suppressed { retries } => {
                        tracing::debug!(
                            "Update of {} '{}' suppressed by callback after {} retries",
                            draft.resource_type,
                            key,
                            retries
                        );
                    }
                    UpdateOutcome::Failed { message, cause } => self.fail(message, cause),
                }
            }
        }
    }

    async fn create(&self, draft: &ResourceDraft, key: &str) {
        let Some(draft) = self.options.before_create(draft.clone()) else {
            tracing::debug!("Create of {} '{}' suppressed by callback", draft.resource_type, key);
            return;
        };

        match self.client.create(&draft).await {
            Ok(created) => {
                tracing::debug!("Created {} '{}' as {}", created.resource_type, key, created.id);
                self.statistics.increment_created();
            }
            Err(err) => self.fail(
                format!(
                    "Failed to create draft with key: '{}'. Reason: {}",
                    key, err
                ),
                err.into(),
            ),
        }
    }

    fn fail(&self, message: String, cause: SyncError) {
        self.options.report_error(&message, Some(&cause));
        self.statistics.increment_failed();
    }
}

use super::diff::UpdateAction;
use super::retry::MAX_CONFLICT_RETRIES;
use crate::error::SyncError;
use crate::model::{ExistingResource, ResourceDraft};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

pub const BATCH_SIZE_DEFAULT: usize = 30;
pub const CACHE_SIZE_DEFAULT: usize = 10_000;

pub type ErrorCallback = Arc<dyn Fn(&str, Option<&SyncError>) + Send + Sync>;
pub type WarningCallback = Arc<dyn Fn(&str) + Send + Sync>;
pub type BeforeCreateCallback = Arc<dyn Fn(ResourceDraft) -> Option<ResourceDraft> + Send + Sync>;
pub type BeforeUpdateCallback = Arc<
    dyn Fn(Vec<UpdateAction>, &ResourceDraft, &ExistingResource) -> Vec<UpdateAction> + Send + Sync,
>;

/// Immutable configuration shared by every component of a sync run
#[derive(Clone)]
pub struct SyncOptions {
    batch_size: usize,
    cache_size: NonZeroUsize,
    max_conflict_retries: u32,
    resource_label: String,
    error_callback: Option<ErrorCallback>,
    warning_callback: Option<WarningCallback>,
    before_create_callback: Option<BeforeCreateCallback>,
    before_update_callback: Option<BeforeUpdateCallback>,
}

impl SyncOptions {
    pub fn builder() -> SyncOptionsBuilder {
        SyncOptionsBuilder::default()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn cache_size(&self) -> NonZeroUsize {
        self.cache_size
    }

    pub fn max_conflict_retries(&self) -> u32 {
        self.max_conflict_retries
    }

    /// Plural noun used in the statistics report ("products", "resources")
    pub fn resource_label(&self) -> &str {
        &self.resource_label
    }

    pub fn has_error_callback(&self) -> bool {
        self.error_callback.is_some()
    }

    pub fn has_warning_callback(&self) -> bool {
        self.warning_callback.is_some()
    }

    pub fn has_before_create_callback(&self) -> bool {
        self.before_create_callback.is_some()
    }

    pub fn has_before_update_callback(&self) -> bool {
        self.before_update_callback.is_some()
    }

    pub(crate) fn report_error(&self, message: &str, cause: Option<&SyncError>) {
        tracing::debug!("sync error: {}", message);
        if let Some(callback) = &self.error_callback {
            callback(message, cause);
        }
    }

    pub(crate) fn report_warning(&self, message: &str) {
        tracing::debug!("sync warning: {}", message);
        if let Some(callback) = &self.warning_callback {
            callback(message);
        }
    }

    /// Draft to create, or `None` when the callback vetoed the create
    pub(crate) fn before_create(&self, draft: ResourceDraft) -> Option<ResourceDraft> {
        match &self.before_create_callback {
            Some(callback) => callback(draft),
            None => Some(draft),
        }
    }

    pub(crate) fn before_update(
        &self,
        actions: Vec<UpdateAction>,
        draft: &ResourceDraft,
        existing: &ExistingResource,
    ) -> Vec<UpdateAction> {
        match &self.before_update_callback {
            Some(callback) => callback(actions, draft, existing),
            None => actions,
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptionsBuilder::default().build()
    }
}

impl fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOptions")
            .field("batch_size", &self.batch_size)
            .field("cache_size", &self.cache_size)
            .field("max_conflict_retries", &self.max_conflict_retries)
            .field("resource_label", &self.resource_label)
            .field("error_callback", &self.has_error_callback())
            .field("warning_callback", &self.has_warning_callback())
            .field("before_create_callback", &self.has_before_create_callback())
            .field("before_update_callback", &self.has_before_update_callback())
            .finish()
    }
}

/// Builder for [`SyncOptions`]
///
/// Sizes are taken as signed integers so that values straight from process
/// configuration can be passed through; anything non-positive falls back
/// to the default instead of failing.
#[derive(Default)]
pub struct SyncOptionsBuilder {
    batch_size: Option<i64>,
    cache_size: Option<i64>,
    max_conflict_retries: Option<u32>,
    resource_label: Option<String>,
    error_callback: Option<ErrorCallback>,
    warning_callback: Option<WarningCallback>,
    before_create_callback: Option<BeforeCreateCallback>,
    before_update_callback: Option<BeforeUpdateCallback>,
}

impl SyncOptionsBuilder {
    pub fn batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn cache_size(mut self, cache_size: i64) -> Self {
        self.cache_size = Some(cache_size);
        self
    }

    pub fn max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = Some(retries);
        self
    }

    pub fn resource_label(mut self, label: impl Into<String>) -> Self {
        self.resource_label = Some(label.into());
        self
    }

    pub fn error_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, Option<&SyncError>) + Send + Sync + 'static,
    {
        self.error_callback = Some(Arc::new(callback));
        self
    }

    pub fn warning_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.warning_callback = Some(Arc::new(callback));
        self
    }

    pub fn before_create_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(ResourceDraft) -> Option<ResourceDraft> + Send + Sync + 'static,
    {
        self.before_create_callback = Some(Arc::new(callback));
        self
    }

    pub fn before_update_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(Vec<UpdateAction>, &ResourceDraft, &ExistingResource) -> Vec<UpdateAction>
            + Send
            + Sync
            + 'static,
    {
        self.before_update_callback = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> SyncOptions {
        let batch_size = positive(self.batch_size).unwrap_or(BATCH_SIZE_DEFAULT);
        let cache_size = positive(self.cache_size)
            .and_then(NonZeroUsize::new)
            .unwrap_or(NonZeroUsize::MIN.saturating_add(CACHE_SIZE_DEFAULT - 1));

        SyncOptions {
            batch_size,
            cache_size,
            max_conflict_retries: self.max_conflict_retries.unwrap_or(MAX_CONFLICT_RETRIES),
            resource_label: self
                .resource_label
                .unwrap_or_else(|| "resources".to_string()),
            error_callback: self.error_callback,
            warning_callback: self.warning_callback,
            before_create_callback: self.before_create_callback,
            before_update_callback: self.before_update_callback,
        }
    }
}

fn positive(value: Option<i64>) -> Option<usize> {
    value
        .filter(|v| *v > 0)
        .and_then(|v| usize::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceType;
    use std::sync::Mutex;

    #[test]
    fn test_defaults() {
        let options = SyncOptions::builder().build();
        assert_eq!(options.batch_size(), BATCH_SIZE_DEFAULT);
        assert_eq!(options.cache_size().get(), 10_000);
        assert_eq!(options.max_conflict_retries(), MAX_CONFLICT_RETRIES);
        assert_eq!(options.resource_label(), "resources");
        assert!(!options.has_error_callback());
        assert!(!options.has_warning_callback());
        assert!(!options.has_before_create_callback());
        assert!(!options.has_before_update_callback());
    }

    #[test]
    fn test_explicit_sizes() {
        let options = SyncOptions::builder().batch_size(10).cache_size(10).build();
        assert_eq!(options.batch_size(), 10);
        assert_eq!(options.cache_size().get(), 10);
    }

    #[test]
    fn test_non_positive_sizes_fall_back() {
        for size in [0, -100] {
            let options = SyncOptions::builder()
                .batch_size(size)
                .cache_size(size)
                .build();
            assert_eq!(options.batch_size(), BATCH_SIZE_DEFAULT);
            assert_eq!(options.cache_size().get(), CACHE_SIZE_DEFAULT);
        }
    }

    #[test]
    fn test_callbacks_are_invoked() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let options = SyncOptions::builder()
            .error_callback(move |message, cause| {
                sink.lock().unwrap().push((message.to_string(), cause.is_some()));
            })
            .before_create_callback(|_| None)
            .before_update_callback(|_, _, _| Vec::new())
            .build();

        options.report_error("boom", None);
        assert_eq!(errors.lock().unwrap().as_slice(), &[("boom".to_string(), false)]);

        let draft = ResourceDraft::new(ResourceType::Types, "t1");
        assert!(options.before_create(draft.clone()).is_none());

        let existing = ExistingResource::from_draft(&draft, "id", 1);
        let actions = vec![UpdateAction::ChangeName { name: None }];
        assert!(options.before_update(actions, &draft, &existing).is_empty());
    }

    #[test]
    fn test_without_callbacks_passes_through() {
        let options = SyncOptions::default();
        let draft = ResourceDraft::new(ResourceType::Types, "t1");
        assert_eq!(options.before_create(draft.clone()), Some(draft));
        options.report_warning("nobody listens");
    }
}

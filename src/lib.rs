//! Batch synchronization of catalog resources
//!
//! Drafts describing the desired state of catalog resources are validated,
//! their references rewritten from remote ids to keys, and then matched by
//! key against the target catalog: missing resources are created, differing
//! ones updated with the actions a [`DiffEngine`] computes. Updates are
//! guarded by version tokens and re-driven on conflict.
//!
//! ```no_run
//! use catsync::{AttributeDiff, MemoryCatalog, SyncEngine, SyncOptions};
//! use std::sync::Arc;
//!
//! # async fn run(drafts: Vec<Option<catsync::ResourceDraft>>) {
//! let options = SyncOptions::builder()
//!     .batch_size(30)
//!     .error_callback(|message, _| eprintln!("{}", message))
//!     .build();
//! let engine = SyncEngine::new(Arc::new(MemoryCatalog::new()), Arc::new(AttributeDiff), options);
//! let stats = engine.sync(drafts).await;
//! println!("{}", stats.report());
//! # }
//! ```

pub mod error;
pub mod model;
pub mod resolve;
pub mod sync;
pub mod transport;

pub use error::{DraftError, ReferenceError, RemoteError, Result, SyncError};
pub use model::{
    AttributeDefinition, AttributeType, ExistingResource, Reference, ReferenceTarget,
    ResourceDraft, ResourceType, ScalarKind,
};
pub use resolve::{ExpansionPath, ReferenceCache, ReferenceResolver, Resolution};
pub use sync::diff::{AttributeDiff, DiffEngine, UpdateAction};
pub use sync::options::{SyncOptions, SyncOptionsBuilder};
pub use sync::stats::SyncStatistics;
pub use sync::SyncEngine;
pub use transport::{CatalogClient, MemoryCatalog, RequestCounts};

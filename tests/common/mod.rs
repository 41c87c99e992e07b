#![allow(dead_code)]

use catsync::{
    AttributeDiff, MemoryCatalog, ResourceDraft, ResourceType, SyncEngine, SyncOptions,
    SyncOptionsBuilder,
};
use std::sync::{Arc, Mutex};

/// Messages handed to the error and warning callbacks, in order
#[derive(Clone, Default)]
pub struct Collected {
    errors: Arc<Mutex<Vec<String>>>,
    warnings: Arc<Mutex<Vec<String>>>,
}

impl Collected {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }

    /// Attach collecting error and warning callbacks to `builder`
    pub fn attach(&self, builder: SyncOptionsBuilder) -> SyncOptionsBuilder {
        let errors = self.errors.clone();
        let warnings = self.warnings.clone();
        builder
            .error_callback(move |message, _| errors.lock().unwrap().push(message.to_string()))
            .warning_callback(move |message| warnings.lock().unwrap().push(message.to_string()))
    }
}

pub fn engine_with(catalog: &Arc<MemoryCatalog>, options: SyncOptions) -> SyncEngine {
    SyncEngine::new(catalog.clone(), Arc::new(AttributeDiff), options)
}

/// Engine with collecting callbacks and otherwise default options
pub fn collecting_engine(catalog: &Arc<MemoryCatalog>) -> (SyncEngine, Collected) {
    let collected = Collected::default();
    let options = collected.attach(SyncOptions::builder()).build();
    (engine_with(catalog, options), collected)
}

pub fn product(key: &str) -> ResourceDraft {
    ResourceDraft::new(ResourceType::Products, key).with_name(format!("Product {}", key))
}

pub fn some(drafts: Vec<ResourceDraft>) -> Vec<Option<ResourceDraft>> {
    drafts.into_iter().map(Some).collect()
}

//! Two-level registry of discovered operations
//!
//! name → shape identity → operation. Registration only ever adds: a later
//! discovery pass that advertises a different output shape for a known name
//! adds a second entry instead of replacing the first, so results can still
//! be repaired for callers holding a capability from the earlier pass.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::descriptor::{OperationDescriptor, RegisteredOperation, ShapeIdentity};

#[derive(Debug, Clone)]
struct Entry {
    operation: RegisteredOperation,
    /// Registration order, used to apply shapes deterministically
    sequence: u64,
}

#[derive(Debug, Default)]
struct Inner {
    operations: HashMap<String, HashMap<ShapeIdentity, Entry>>,
    next_sequence: u64,
}

/// Thread-safe registry of `RegisteredOperation`s
///
/// Writers take one lock for a whole batch; readers get cloned snapshots.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    inner: RwLock<Inner>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a batch and return it as registered operations
    ///
    /// An inner map is created for a new name and never replaced for a known
    /// one. Re-registering an identical shape refreshes the descriptor but
    /// keeps its original position.
    pub fn register(&self, descriptors: Vec<OperationDescriptor>) -> Vec<RegisteredOperation> {
        let batch: Vec<RegisteredOperation> = descriptors.into_iter().map(RegisteredOperation::new).collect();

        let mut inner = self.inner.write();
        for operation in &batch {
            let sequence = inner.next_sequence;
            let shapes = inner.operations.entry(operation.name().to_string()).or_default();
            let mut inserted = false;
            shapes
                .entry(operation.identity.clone())
                .and_modify(|entry| entry.operation = operation.clone())
                .or_insert_with(|| {
                    inserted = true;
                    Entry {
                        operation: operation.clone(),
                        sequence,
                    }
                });
            if inserted {
                inner.next_sequence += 1;
            }
        }

        batch
    }

    /// Whether any shape is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().operations.contains_key(name)
    }

    /// Every shape registered under `name`, oldest first
    pub fn shapes_for(&self, name: &str) -> Option<Vec<RegisteredOperation>> {
        let inner = self.inner.read();
        let shapes = inner.operations.get(name)?;
        let mut entries: Vec<&Entry> = shapes.values().collect();
        entries.sort_by_key(|e| e.sequence);
        Some(entries.into_iter().map(|e| e.operation.clone()).collect())
    }

    /// One specific shape of an operation
    pub fn get(&self, name: &str, identity: &ShapeIdentity) -> Option<RegisteredOperation> {
        self.inner
            .read()
            .operations
            .get(name)?
            .get(identity)
            .map(|e| e.operation.clone())
    }

    /// Number of distinct operation names
    pub fn operation_count(&self) -> usize {
        self.inner.read().operations.len()
    }

    /// Number of (name, shape) entries
    pub fn shape_count(&self) -> usize {
        self.inner.read().operations.values().map(HashMap::len).sum()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().operations.keys().cloned().collect();
        names.sort();
        names
    }
}

//! Configuration store boundary
//!
//! The store is an external collaborator: an opaque connection handle that
//! answers path-based scalar lookups with "found with value" or "not found".
//! Transient query failures are indistinguishable from "not found"; only
//! connecting can fail distinctly.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use quorumboot_common::BootstrapError;

/// Connection factory for the configuration store
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Open a connection, optionally scoped to a named cluster
    async fn connect(
        &self,
        cluster_name: Option<&str>,
    ) -> Result<Box<dyn ConfigConnection>, BootstrapError>;
}

/// One open store connection
///
/// Connections are scoped resources: dropping the handle releases the
/// connection, on every exit path.
#[async_trait]
pub trait ConfigConnection: Send + Sync {
    /// Scalar lookup: the value at `path`, or `None` when the path does not
    /// resolve
    async fn get(&self, path: &str) -> Option<String>;
}

/// In-memory path-to-value store, for tests and embedded use
#[derive(Clone, Debug, Default)]
pub struct MemoryConfigStore {
    entries: Arc<HashMap<String, String>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one path/value pair, builder style
    pub fn with(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.entries).insert(path.into(), value.into());
        self
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn connect(
        &self,
        _cluster_name: Option<&str>,
    ) -> Result<Box<dyn ConfigConnection>, BootstrapError> {
        Ok(Box::new(MemoryConfigConnection {
            entries: self.entries.clone(),
        }))
    }
}

struct MemoryConfigConnection {
    entries: Arc<HashMap<String, String>>,
}

#[async_trait]
impl ConfigConnection for MemoryConfigConnection {
    async fn get(&self, path: &str) -> Option<String> {
        self.entries.get(path).cloned()
    }
}

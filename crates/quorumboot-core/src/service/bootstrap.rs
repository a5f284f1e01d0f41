//! Bootstrap orchestration
//!
//! One `Bootstrap` owns the state of a node's admission into the cluster:
//! the held configuration version and the environment override set. It is
//! driven by one caller at a time; concurrent passes are not supported.

use tracing::error;

use quorumboot_api::{
    model::{JoinInfo, NodeRegistry},
    store::ConfigStore,
};
use quorumboot_common::BootstrapError;

use crate::model::JoinOverrides;

use super::{JoinInfoBuilder, JoinInvoker, MembershipTransport, NodeRegistryLoader};

/// Drives one node's bootstrap: registry load, join derivation, hand-off
pub struct Bootstrap {
    loader: NodeRegistryLoader,
    overrides: JoinOverrides,
}

impl Bootstrap {
    /// Overrides are read from the environment once, at construction
    pub fn new() -> Self {
        Self::with_overrides(JoinOverrides::from_env())
    }

    pub fn with_overrides(overrides: JoinOverrides) -> Self {
        Self {
            loader: NodeRegistryLoader::new(),
            overrides,
        }
    }

    /// Load the configured node registry.
    ///
    /// Also the entry point for the reread-config trigger: the held
    /// configuration version carries over between passes, so configuration
    /// drift aborts the reread.
    pub async fn load_registry(
        &mut self,
        store: &dyn ConfigStore,
    ) -> Result<NodeRegistry, BootstrapError> {
        self.loader.load(store).await
    }

    /// Derive the join parameters and hand them to the membership transport.
    ///
    /// Nothing reaches the transport unless every parameter derived
    /// cleanly; there is no partial join.
    pub async fn join(
        &self,
        store: &dyn ConfigStore,
        transport: &dyn MembershipTransport,
    ) -> anyhow::Result<JoinInfo> {
        let info = JoinInfoBuilder::new(self.overrides.clone())
            .build(store)
            .await
            .inspect_err(|e| error!("error reading join configuration, cannot start: {}", e))?;

        JoinInvoker::invoke(transport, &info)
            .await
            .inspect_err(|e| error!("membership join failed: {}", e))?;
        Ok(info)
    }
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self::new()
    }
}

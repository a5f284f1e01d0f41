//! Node registry loading
//!
//! Walks the ordered node list in the configuration store and materializes
//! one record per entry. Runs at startup and again on a reread-config
//! trigger.

use tracing::{debug, error, info};

use quorumboot_api::{
    model::{DEFAULT_NODE_VOTES, NodeRecord, NodeRegistry},
    paths,
    store::ConfigStore,
};
use quorumboot_common::BootstrapError;

use super::{parse_node_votes, parse_scalar};

/// Loads the configured node list into an in-memory registry.
///
/// The loader holds the configuration version accepted by its last
/// successful pass; a later pass that observes a different version fails
/// without touching the held value.
#[derive(Debug, Default)]
pub struct NodeRegistryLoader {
    held_version: Option<u64>,
}

impl NodeRegistryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration version accepted by the last successful pass
    pub fn held_version(&self) -> Option<u64> {
        self.held_version
    }

    /// Load one registry pass from the store.
    ///
    /// Node enumeration is positional and 1-based; the sequence ends at the
    /// first name lookup miss. No explicit count field is trusted.
    pub async fn load(&mut self, store: &dyn ConfigStore) -> Result<NodeRegistry, BootstrapError> {
        let conn = store
            .connect(None)
            .await
            .inspect_err(|e| error!("error connecting to configuration store: {}", e))?;

        let mut registry = NodeRegistry::default();

        if let Some(raw) = conn.get(paths::CONFIG_VERSION_PATH).await
            && let Some(version) = parse_scalar::<u64>(paths::CONFIG_VERSION_PATH, &raw)
        {
            if let Some(held) = self.held_version
                && held != version
            {
                error!(
                    "configuration version is {}, expected {}; configuration not updated",
                    version, held
                );
                return Err(BootstrapError::ConfigVersionMismatch {
                    held,
                    found: version,
                });
            }
            self.held_version = Some(version);
            registry.config_version = Some(version);
        }

        if let Some(raw) = conn.get(paths::EXPECTED_VOTES_PATH).await {
            registry.expected_votes = parse_scalar::<u32>(paths::EXPECTED_VOTES_PATH, &raw);
        }

        registry.two_node = conn
            .get(paths::TWO_NODE_PATH)
            .await
            .and_then(|raw| parse_scalar::<i64>(paths::TWO_NODE_PATH, &raw))
            .map(|flag| flag != 0)
            .unwrap_or(false);

        for index in 1.. {
            let Some(name) = conn.get(&paths::node_name_by_index(index)).await else {
                break;
            };

            let votes_path = paths::node_votes_path(&name);
            let votes = match conn.get(&votes_path).await {
                Some(raw) => parse_node_votes(&votes_path, &raw)?,
                None => DEFAULT_NODE_VOTES,
            };

            let id_path = paths::node_id_path(&name);
            let node_id = match conn.get(&id_path).await {
                Some(raw) => parse_scalar::<u32>(&id_path, &raw),
                None => None,
            };

            debug!("got node {} from store (id={:?}, votes={})", name, node_id, votes);
            registry.nodes.push(NodeRecord {
                name,
                node_id,
                votes,
            });
        }

        info!(
            "loaded {} cluster nodes, expected votes {}",
            registry.node_count(),
            registry.effective_expected_votes()
        );
        Ok(registry)
    }
}

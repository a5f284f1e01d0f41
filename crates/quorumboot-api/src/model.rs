//! Data model for cluster bootstrap
//!
//! These types cross the boundary to the membership layer and are built
//! once per bootstrap pass.

use serde::{Deserialize, Serialize};

/// Default membership protocol port
pub const DEFAULT_PORT: u16 = 6809;

/// Default multicast group for IPv4 clusters
pub const DEFAULT_MCAST_V4: &str = "239.192.9.1";

/// Default multicast group for IPv6 clusters
pub const DEFAULT_MCAST_V6: &str = "FF15::1";

/// Upper bound on the names a node may be known by, canonical name included
pub const MAX_NODE_ALIASES: usize = 10;

/// Vote weight of a node with no explicit votes entry
pub const DEFAULT_NODE_VOTES: u32 = 1;

/// One configured cluster node, as materialized during a registry pass.
/// Immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    /// Numeric id; may be absent and assigned later by the membership layer
    pub node_id: Option<u32>,
    pub votes: u32,
}

/// Output of one registry load pass, in encounter order
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeRegistry {
    pub nodes: Vec<NodeRecord>,
    /// Cluster-level expected-votes override; authoritative over any
    /// computed vote sum when present
    pub expected_votes: Option<u32>,
    /// Whether the cluster is configured for two-node mode
    pub two_node: bool,
    /// Configuration version observed by this pass, when published
    pub config_version: Option<u64>,
}

impl NodeRegistry {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Sum of all node vote weights
    pub fn vote_sum(&self) -> u64 {
        self.nodes.iter().map(|node| u64::from(node.votes)).sum()
    }

    /// Expected votes for the cluster: the configured override when present,
    /// otherwise the sum of all node votes
    pub fn effective_expected_votes(&self) -> u64 {
        match self.expected_votes {
            Some(votes) => u64::from(votes),
            None => self.vote_sum(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|node| node.name == name)
    }
}

/// The names this host is known by inside the cluster configuration.
/// `aliases[0]` always equals `local_node_name`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterIdentity {
    pub cluster_name: String,
    /// Canonical configured node name, as opposed to any locally observed
    /// hostname form
    pub local_node_name: String,
    pub aliases: Vec<String>,
}

/// Parameters handed to the membership join primitive
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinParameters {
    pub cluster_name: String,
    pub local_node_name: String,
    /// Local vote weight, in 0..=255
    pub votes: u32,
    pub expected_votes: u32,
    pub port: u16,
    /// Unset when no address was configured and none could be derived
    pub multicast_address: Option<String>,
    /// Absent disables key-based authentication downstream
    pub key_file: Option<String>,
    pub two_node: bool,
}

/// Everything the membership layer needs from one bootstrap pass.
/// Consumed exactly once by the join invoker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JoinInfo {
    pub identity: ClusterIdentity,
    /// Numeric node id; absent means the membership layer assigns one
    pub node_id: Option<u32>,
    pub params: JoinParameters,
}

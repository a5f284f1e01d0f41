//! Path addressing scheme of the configuration store
//!
//! The store is hierarchical and path-addressed, with positional indices
//! (`node[N]`, 1-based) and name-keyed predicates (`node[@name="X"]`).
//! Everything outside this module treats paths as opaque lookup keys.

/// Cluster-wide scalars
pub const CONFIG_VERSION_PATH: &str = "/cluster/@config_version";
pub const CLUSTER_NAME_PATH: &str = "/cluster/@name";
pub const EXPECTED_VOTES_PATH: &str = "/cluster/quorum/@expected_votes";
pub const TWO_NODE_PATH: &str = "/cluster/quorum/@two_node";
pub const PORT_PATH: &str = "/cluster/quorum/@port";
pub const KEYFILE_PATH: &str = "/cluster/quorum/@keyfile";
pub const MCAST_ADDR_PATH: &str = "/cluster/quorum/multicast/@addr";

/// Name of the node at 1-based position `index`
pub fn node_name_by_index(index: usize) -> String {
    format!("/cluster/nodes/node[{index}]/@name")
}

/// Name of the node keyed by its own name; resolves iff the node exists
pub fn node_name_by_name(name: &str) -> String {
    format!("/cluster/nodes/node[@name=\"{name}\"]/@name")
}

/// Vote weight of the named node
pub fn node_votes_path(name: &str) -> String {
    format!("/cluster/nodes/node[@name=\"{name}\"]/@votes")
}

/// Numeric id of the named node
pub fn node_id_path(name: &str) -> String {
    format!("/cluster/nodes/node[@name=\"{name}\"]/@nodeid")
}

/// Alternate name of the named node at 1-based position `index`
pub fn node_altname_path(name: &str, index: usize) -> String {
    format!("/cluster/nodes/node[@name=\"{name}\"]/altname[{index}]/@name")
}

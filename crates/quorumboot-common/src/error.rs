//! Error types for the bootstrap subsystem
//!
//! Every failure kind is terminal to the current bootstrap attempt; nothing
//! is retried internally. Variants carry the offending path or value so
//! callers can log something actionable.

/// Bootstrap failure kinds
#[derive(thiserror::Error, Debug)]
pub enum BootstrapError {
    #[error("error connecting to configuration store: {0}")]
    StoreConnectFailed(String),

    #[error("configuration version is {found}, expected {held}; configuration not updated")]
    ConfigVersionMismatch { held: u64, found: u64 },

    #[error("cannot find cluster name in configuration")]
    ClusterNameMissing,

    #[error("cluster names not equal: {requested} {configured}")]
    ClusterNameMismatch {
        requested: String,
        configured: String,
    },

    #[error("no configured node matches host \"{hostname}\"")]
    IdentityNotFound { hostname: String },

    #[error("local node name \"{hostname}\" not found in configuration")]
    NodeNotConfigured { hostname: String },

    #[error("invalid votes value {value:?} at {path}")]
    InvalidVotes { path: String, value: String },

    #[error(
        "two-node mode requires exactly two nodes with one vote each \
         (nodes={node_count}, vote sum={vote_sum}, local votes={local_votes})"
    )]
    TwoNodeConstraintViolation {
        node_count: usize,
        vote_sum: u64,
        local_votes: u32,
    },

    #[error("cannot determine local host name: {0}")]
    HostIdentityUnavailable(String),
}

// Bootstrap services: registry load, identity resolution, join derivation

pub mod bootstrap;
pub mod identity;
pub mod join;
pub mod join_info;
pub mod registry;

// Re-export commonly used types
pub use bootstrap::Bootstrap;
pub use identity::IdentityResolver;
pub use join::{JoinInvoker, MembershipTransport};
pub use join_info::JoinInfoBuilder;
pub use registry::NodeRegistryLoader;

use std::str::FromStr;

use tracing::{error, warn};

use quorumboot_common::BootstrapError;

/// Parse an optional numeric scalar; an unparseable value is ignored with a
/// warning, as if the path had not resolved.
pub(crate) fn parse_scalar<T: FromStr>(path: &str, raw: &str) -> Option<T> {
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring unparseable value {:?} at {}", raw, path);
            None
        }
    }
}

/// Parse a per-node votes value. A negative or unparseable value is a hard
/// validation error, never clamped.
pub(crate) fn parse_node_votes(path: &str, raw: &str) -> Result<u32, BootstrapError> {
    let invalid = || BootstrapError::InvalidVotes {
        path: path.to_string(),
        value: raw.to_string(),
    };
    let value = raw.trim().parse::<i64>().map_err(|_| invalid())?;
    if value < 0 {
        error!("negative votes not allowed at {}", path);
        return Err(invalid());
    }
    u32::try_from(value).map_err(|_| invalid())
}

//! Environment override model
//!
//! Each derivation step of the join-info builder consults its override
//! before touching the configuration store; a set override skips the
//! corresponding store query entirely.

use std::str::FromStr;

use tracing::warn;

pub const CLUSTER_NAME_ENV: &str = "QUORUMBOOT_CLUSTER_NAME";
pub const NODE_NAME_ENV: &str = "QUORUMBOOT_NODE_NAME";
pub const EXPECTED_VOTES_ENV: &str = "QUORUMBOOT_EXPECTED_VOTES";
pub const PORT_ENV: &str = "QUORUMBOOT_PORT";
pub const NODE_ID_ENV: &str = "QUORUMBOOT_NODE_ID";
pub const VOTES_ENV: &str = "QUORUMBOOT_VOTES";
pub const MCAST_ADDR_ENV: &str = "QUORUMBOOT_MCAST_ADDR";

/// Recognized environment overrides for one bootstrap pass
#[derive(Clone, Debug, Default)]
pub struct JoinOverrides {
    pub cluster_name: Option<String>,
    pub node_name: Option<String>,
    /// Validated positive at parse time; an invalid value is ignored
    pub expected_votes: Option<u32>,
    pub port: Option<u16>,
    pub node_id: Option<u32>,
    /// Kept wide here; the builder validates the 0..=255 range
    pub votes: Option<i64>,
    pub multicast_address: Option<String>,
}

impl JoinOverrides {
    /// Read the recognized override variables from the environment
    pub fn from_env() -> Self {
        Self {
            cluster_name: env_string(CLUSTER_NAME_ENV),
            node_name: env_string(NODE_NAME_ENV),
            expected_votes: env_string(EXPECTED_VOTES_ENV)
                .and_then(|raw| parse_expected_votes(&raw)),
            port: env_string(PORT_ENV).and_then(|raw| parse_env_number(PORT_ENV, &raw)),
            node_id: env_string(NODE_ID_ENV).and_then(|raw| parse_env_number(NODE_ID_ENV, &raw)),
            votes: env_string(VOTES_ENV).and_then(|raw| parse_env_number(VOTES_ENV, &raw)),
            multicast_address: env_string(MCAST_ADDR_ENV),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// An expected-votes override must be a positive integer, else it is ignored
fn parse_expected_votes(raw: &str) -> Option<u32> {
    match raw.trim().parse::<u32>() {
        Ok(value) if value >= 1 => Some(value),
        _ => {
            warn!(
                "{} value {:?} is not a positive integer, ignoring",
                EXPECTED_VOTES_ENV, raw
            );
            None
        }
    }
}

fn parse_env_number<T: FromStr>(name: &str, raw: &str) -> Option<T> {
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("{} value {:?} is not numeric, ignoring", name, raw);
            None
        }
    }
}

//! Local node identity resolution
//!
//! Local host names are unreliable: the machine may report a fully
//! qualified name, a short name, or something unrelated to the
//! administratively assigned node name. Resolution runs an ordered cascade
//! of matching strategies, each tried only if the previous one fails,
//! always preferring the most specific match.

use std::net::IpAddr;

use tracing::debug;

use quorumboot_api::{paths, store::ConfigConnection};
use quorumboot_common::{BootstrapError, utils};

/// Resolves which configured node entry represents this machine
pub struct IdentityResolver;

impl IdentityResolver {
    /// Find the canonical configured node name for `candidate`.
    ///
    /// Strategies, first success wins:
    /// 1. exact match against the configured names
    /// 2. domain-stripped match (the stripped form becomes canonical)
    /// 3. scan of configured names with their own domains stripped
    /// 4. exact and domain-stripped match of each local interface's
    ///    reverse-resolved name
    pub async fn resolve(
        conn: &dyn ConfigConnection,
        candidate: &str,
    ) -> Result<String, BootstrapError> {
        if let Some(name) = Self::match_name(conn, candidate).await {
            return Ok(name);
        }
        if let Some(name) = Self::scan_configured_names(conn, candidate).await {
            return Ok(name);
        }
        if let Some(name) = Self::scan_interfaces(conn).await {
            return Ok(name);
        }
        Err(BootstrapError::IdentityNotFound {
            hostname: candidate.to_string(),
        })
    }

    /// Strategies 1 and 2: exact match, then the domain-less form
    async fn match_name(conn: &dyn ConfigConnection, candidate: &str) -> Option<String> {
        if Self::name_configured(conn, candidate).await {
            return Some(candidate.to_string());
        }

        let short = strip_domain(candidate);
        if short.len() != candidate.len() && Self::name_configured(conn, short).await {
            return Some(short.to_string());
        }
        None
    }

    async fn name_configured(conn: &dyn ConfigConnection, name: &str) -> bool {
        if !utils::is_valid_node_name(name) {
            debug!("{:?} is not a valid node name, treating as not configured", name);
            return false;
        }
        conn.get(&paths::node_name_by_name(name)).await.is_some()
    }

    /// Strategy 3: the candidate may be domain-less while the configured
    /// names carry a domain. Compare the stripped forms with full
    /// length-and-content equality; prefix containment must never match.
    async fn scan_configured_names(
        conn: &dyn ConfigConnection,
        candidate: &str,
    ) -> Option<String> {
        let short = strip_domain(candidate);

        for index in 1.. {
            let configured = conn.get(&paths::node_name_by_index(index)).await?;
            let stripped = strip_domain(&configured);
            if short == stripped {
                return Some(stripped.to_string());
            }
        }
        None
    }

    /// Strategy 4: the configured names may match a host name bound to one
    /// of the local interfaces rather than anything the OS reports.
    /// Interfaces are tried in system-reported order; the first match wins.
    async fn scan_interfaces(conn: &dyn ConfigConnection) -> Option<String> {
        for addr in utils::ipv4_interface_addrs() {
            let Some(resolved) = utils::reverse_lookup(IpAddr::V4(addr)) else {
                debug!("no reverse name for interface address {}, skipping", addr);
                continue;
            };
            if let Some(name) = Self::match_name(conn, &resolved).await {
                return Some(name);
            }
        }
        None
    }
}

/// Truncate at the first `.`, if any
fn strip_domain(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

//! Host identity and network helpers
//!
//! Common helper functions used across the codebase.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::LazyLock;

use if_addrs::IfAddr;

/// Regex pattern for validating node names and aliases
static NODE_NAME_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new("^[a-zA-Z0-9_.:-]+$").expect("Invalid regex pattern"));

/// Validate a node name contains only allowed characters
///
/// Allowed characters: alphanumeric, underscore, dot, colon, hyphen. Node
/// names are interpolated into quoted store paths, so anything else must
/// never reach a by-name query.
pub fn is_valid_node_name(name: &str) -> bool {
    NODE_NAME_PATTERN.is_match(name)
}

/// Get the host name the operating system reports for this machine
pub fn local_host_name() -> Option<String> {
    hostname::get()
        .ok()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}

/// IPv4 addresses of the local interfaces, in system-reported order
pub fn ipv4_interface_addrs() -> Vec<Ipv4Addr> {
    if_addrs::get_if_addrs()
        .map(|addrs| {
            addrs
                .into_iter()
                .filter_map(|iface| match iface.addr {
                    IfAddr::V4(addr) => Some(addr.ip),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Reverse-resolve an interface address to a host name
pub fn reverse_lookup(addr: IpAddr) -> Option<String> {
    dns_lookup::lookup_addr(&addr).ok()
}

/// Resolve a host name to its first reported address
///
/// Used to pick an address family; the address itself is not kept.
pub fn resolve_host_addr(name: &str) -> Option<IpAddr> {
    dns_lookup::lookup_host(name)
        .ok()
        .and_then(|addrs| addrs.into_iter().next())
}

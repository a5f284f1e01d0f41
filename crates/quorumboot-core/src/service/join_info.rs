//! Join parameter derivation
//!
//! Orchestrates identity resolution and derives every parameter needed to
//! join the cluster. Each step consults its environment override first; a
//! set override skips the corresponding store query entirely. All steps
//! share one store connection, released on every exit path.

use std::net::IpAddr;

use tracing::{error, info, warn};

use quorumboot_api::{
    model::{
        ClusterIdentity, DEFAULT_MCAST_V4, DEFAULT_MCAST_V6, DEFAULT_NODE_VOTES, DEFAULT_PORT,
        JoinInfo, JoinParameters, MAX_NODE_ALIASES,
    },
    paths,
    store::{ConfigConnection, ConfigStore},
};
use quorumboot_common::{BootstrapError, utils};

use crate::model::{JoinOverrides, VOTES_ENV};

use super::{IdentityResolver, parse_node_votes, parse_scalar};

/// Derives the full set of join parameters for this host.
///
/// The derived parameters are final for this bootstrap pass; nothing is
/// re-derived mid-join.
#[derive(Clone, Debug, Default)]
pub struct JoinInfoBuilder {
    overrides: JoinOverrides,
}

impl JoinInfoBuilder {
    pub fn new(overrides: JoinOverrides) -> Self {
        Self { overrides }
    }

    pub async fn build(&self, store: &dyn ConfigStore) -> Result<JoinInfo, BootstrapError> {
        let ov = &self.overrides;

        if let Some(name) = &ov.cluster_name {
            info!("using override cluster name {}", name);
        }
        let conn = store
            .connect(ov.cluster_name.as_deref())
            .await
            .inspect_err(|e| error!("error connecting to configuration store: {}", e))?;

        // cluster name
        let configured_name = match conn.get(paths::CLUSTER_NAME_PATH).await {
            Some(name) => name,
            None => {
                error!("cannot find cluster name in configuration");
                return Err(BootstrapError::ClusterNameMissing);
            }
        };
        let cluster_name = match &ov.cluster_name {
            Some(requested) if *requested != configured_name => {
                error!("cluster names not equal: {} {}", requested, configured_name);
                return Err(BootstrapError::ClusterNameMismatch {
                    requested: requested.clone(),
                    configured: configured_name,
                });
            }
            Some(requested) => requested.clone(),
            None => configured_name,
        };

        // local host name, from override or from the OS
        let hostname = match &ov.node_name {
            Some(name) => {
                info!("using override node name {}", name);
                name.clone()
            }
            None => utils::local_host_name().ok_or_else(|| {
                error!("cannot get node name from the operating system");
                BootstrapError::HostIdentityUnavailable(
                    "operating system reported no host name".to_string(),
                )
            })?,
        };

        // canonical node name
        let local_node_name = match IdentityResolver::resolve(&*conn, &hostname).await {
            Ok(name) => name,
            Err(BootstrapError::IdentityNotFound { hostname }) => {
                error!("local node name {:?} not found in configuration", hostname);
                return Err(BootstrapError::NodeNotConfigured { hostname });
            }
            Err(e) => return Err(e),
        };

        // expected votes; the override skips the vote-sum enumeration, the
        // explicit config scalar supersedes the computed sum
        let mut node_count = 0usize;
        let mut vote_sum = 0u64;
        let expected_votes = match ov.expected_votes {
            Some(votes) => {
                info!("using override expected votes {}", votes);
                votes
            }
            None => {
                for index in 1.. {
                    let Some(name) = conn.get(&paths::node_name_by_index(index)).await else {
                        break;
                    };
                    node_count += 1;

                    let votes_path = paths::node_votes_path(&name);
                    let votes = match conn.get(&votes_path).await {
                        Some(raw) => parse_node_votes(&votes_path, &raw)?,
                        None => DEFAULT_NODE_VOTES,
                    };
                    vote_sum += u64::from(votes);
                }

                match conn.get(paths::EXPECTED_VOTES_PATH).await {
                    Some(raw) => parse_scalar::<u32>(paths::EXPECTED_VOTES_PATH, &raw)
                        .unwrap_or_else(|| saturated(vote_sum)),
                    None => saturated(vote_sum),
                }
            }
        };

        // port
        let port = match ov.port {
            Some(port) => {
                info!("using override port {}", port);
                port
            }
            None => conn
                .get(paths::PORT_PATH)
                .await
                .and_then(|raw| parse_scalar::<u16>(paths::PORT_PATH, &raw))
                .unwrap_or(DEFAULT_PORT),
        };

        // optional security key file
        let key_file = conn.get(paths::KEYFILE_PATH).await;

        // our own vote count
        let votes = match ov.votes {
            Some(value) => {
                let votes = validate_votes(VOTES_ENV, value, &value.to_string())?;
                info!("using override votes {}", votes);
                votes
            }
            None => {
                let votes_path = paths::node_votes_path(&local_node_name);
                match conn.get(&votes_path).await {
                    Some(raw) => {
                        let value =
                            raw.trim()
                                .parse::<i64>()
                                .map_err(|_| BootstrapError::InvalidVotes {
                                    path: votes_path.clone(),
                                    value: raw.clone(),
                                })?;
                        validate_votes(&votes_path, value, &raw)?
                    }
                    None => DEFAULT_NODE_VOTES,
                }
            }
        };

        // node id; absent is tolerated and assigned later
        let node_id = match ov.node_id {
            Some(id) => {
                info!("using override node id {}", id);
                Some(id)
            }
            None => {
                let id_path = paths::node_id_path(&local_node_name);
                match conn.get(&id_path).await {
                    Some(raw) => parse_scalar::<u32>(&id_path, &raw),
                    None => None,
                }
            }
        };

        // all the names this node is known by
        let aliases = collect_aliases(&*conn, &local_node_name).await;

        // multicast address
        let multicast_address = match &ov.multicast_address {
            Some(addr) => {
                info!("using override multicast address {}", addr);
                Some(addr.clone())
            }
            None => match conn.get(paths::MCAST_ADDR_PATH).await {
                Some(addr) => Some(addr),
                None => match default_multicast(&local_node_name) {
                    Some(addr) => {
                        info!("using default multicast address {}", addr);
                        Some(addr.to_string())
                    }
                    None => {
                        warn!(
                            "cannot determine address family of node name {}, \
                             no default multicast address",
                            local_node_name
                        );
                        None
                    }
                },
            },
        };

        // two-node mode
        let two_node = conn
            .get(paths::TWO_NODE_PATH)
            .await
            .and_then(|raw| parse_scalar::<i64>(paths::TWO_NODE_PATH, &raw))
            .map(|flag| flag != 0)
            .unwrap_or(false);
        if two_node && (node_count != 2 || vote_sum != 2 || votes != 1) {
            error!(
                "the two-node option requires exactly two nodes with one vote each \
                 (node_count={} vote_sum={} votes={})",
                node_count, vote_sum, votes
            );
            return Err(BootstrapError::TwoNodeConstraintViolation {
                node_count,
                vote_sum,
                local_votes: votes,
            });
        }

        Ok(JoinInfo {
            identity: ClusterIdentity {
                cluster_name: cluster_name.clone(),
                local_node_name: local_node_name.clone(),
                aliases,
            },
            node_id,
            params: JoinParameters {
                cluster_name,
                local_node_name,
                votes,
                expected_votes,
                port,
                multicast_address,
                key_file,
                two_node,
            },
        })
    }
}

/// Collect the names this node is known by, canonical name first.
///
/// The store can return the last real value again when queried past the end
/// of a short list, so a value equal to the immediately preceding name
/// terminates collection. A real list whose next element legitimately
/// repeats the previous one is truncated by this; known approximation.
async fn collect_aliases(conn: &dyn ConfigConnection, canonical: &str) -> Vec<String> {
    let mut names = vec![canonical.to_string()];

    for index in 1.. {
        if names.len() >= MAX_NODE_ALIASES {
            break;
        }
        let Some(name) = conn.get(&paths::node_altname_path(canonical, index)).await else {
            break;
        };
        if Some(&name) == names.last() {
            break;
        }
        names.push(name);
    }
    names
}

/// Pick a default multicast group from the canonical name's address family
fn default_multicast(node_name: &str) -> Option<&'static str> {
    match utils::resolve_host_addr(node_name)? {
        IpAddr::V4(_) => Some(DEFAULT_MCAST_V4),
        IpAddr::V6(_) => Some(DEFAULT_MCAST_V6),
    }
}

/// A local vote count must lie in 0..=255
fn validate_votes(path: &str, value: i64, raw: &str) -> Result<u32, BootstrapError> {
    if !(0..=255).contains(&value) {
        error!("invalid votes value {} at {}", value, path);
        return Err(BootstrapError::InvalidVotes {
            path: path.to_string(),
            value: raw.to_string(),
        });
    }
    Ok(value as u32)
}

fn saturated(vote_sum: u64) -> u32 {
    u32::try_from(vote_sum).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use quorumboot_api::store::MemoryConfigStore;

    use super::*;

    /// Two nodes named by loopback literals so the multicast default is
    /// derivable without touching a resolver.
    fn two_node_store() -> MemoryConfigStore {
        MemoryConfigStore::new()
            .with("/cluster/@name", "alpha")
            .with("/cluster/nodes/node[1]/@name", "127.0.0.1")
            .with("/cluster/nodes/node[2]/@name", "127.0.0.2")
            .with(paths::node_name_by_name("127.0.0.1"), "127.0.0.1")
            .with(paths::node_name_by_name("127.0.0.2"), "127.0.0.2")
    }

    fn builder_for(node: &str) -> JoinInfoBuilder {
        JoinInfoBuilder::new(JoinOverrides {
            node_name: Some(node.to_string()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_build_with_defaults() {
        let info = builder_for("127.0.0.1")
            .build(&two_node_store())
            .await
            .unwrap();

        assert_eq!(info.params.cluster_name, "alpha");
        assert_eq!(info.params.local_node_name, "127.0.0.1");
        assert_eq!(info.params.votes, 1);
        assert_eq!(info.params.expected_votes, 2);
        assert_eq!(info.params.port, DEFAULT_PORT);
        assert_eq!(info.params.key_file, None);
        assert!(!info.params.two_node);
        assert_eq!(info.node_id, None);
        assert_eq!(info.identity.aliases, ["127.0.0.1"]);
    }

    #[tokio::test]
    async fn test_missing_cluster_name_fails() {
        let store = MemoryConfigStore::new().with("/cluster/nodes/node[1]/@name", "a");
        let err = builder_for("a").build(&store).await.unwrap_err();
        assert!(matches!(err, BootstrapError::ClusterNameMissing));
    }

    #[tokio::test]
    async fn test_cluster_name_override_must_agree() {
        let overrides = JoinOverrides {
            cluster_name: Some("beta".to_string()),
            node_name: Some("127.0.0.1".to_string()),
            ..Default::default()
        };
        let err = JoinInfoBuilder::new(overrides)
            .build(&two_node_store())
            .await
            .unwrap_err();
        assert!(matches!(err, BootstrapError::ClusterNameMismatch { .. }));
    }

    #[tokio::test]
    async fn test_unconfigured_host_surfaces_as_node_not_configured() {
        let err = builder_for("stray.example.com")
            .build(&two_node_store())
            .await
            .unwrap_err();
        assert!(matches!(err, BootstrapError::NodeNotConfigured { .. }));
    }

    #[tokio::test]
    async fn test_explicit_config_scalars() {
        let store = two_node_store()
            .with("/cluster/quorum/@port", "7110")
            .with("/cluster/quorum/@keyfile", "/etc/cluster/keyfile")
            .with(paths::node_votes_path("127.0.0.1"), "3")
            .with(paths::node_id_path("127.0.0.1"), "11");

        let info = builder_for("127.0.0.1").build(&store).await.unwrap();
        assert_eq!(info.params.port, 7110);
        assert_eq!(info.params.key_file.as_deref(), Some("/etc/cluster/keyfile"));
        assert_eq!(info.params.votes, 3);
        assert_eq!(info.node_id, Some(11));
        // node[1] carries 3 votes now, node[2] the default 1
        assert_eq!(info.params.expected_votes, 4);
    }

    #[tokio::test]
    async fn test_config_expected_votes_supersedes_computed_sum() {
        let store = two_node_store().with("/cluster/quorum/@expected_votes", "5");
        let info = builder_for("127.0.0.1").build(&store).await.unwrap();
        assert_eq!(info.params.expected_votes, 5);
    }

    #[tokio::test]
    async fn test_negative_vote_sum_entry_fails() {
        let store = two_node_store().with(paths::node_votes_path("127.0.0.2"), "-2");
        let err = builder_for("127.0.0.1").build(&store).await.unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidVotes { .. }));
    }

    #[tokio::test]
    async fn test_local_votes_out_of_range_fails() {
        let store = two_node_store().with(paths::node_votes_path("127.0.0.1"), "300");
        let err = builder_for("127.0.0.1").build(&store).await.unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidVotes { .. }));

        let overrides = JoinOverrides {
            node_name: Some("127.0.0.1".to_string()),
            votes: Some(-1),
            ..Default::default()
        };
        let err = JoinInfoBuilder::new(overrides)
            .build(&two_node_store())
            .await
            .unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidVotes { .. }));
    }

    #[tokio::test]
    async fn test_vote_override_of_zero_is_used() {
        let overrides = JoinOverrides {
            node_name: Some("127.0.0.1".to_string()),
            votes: Some(0),
            ..Default::default()
        };
        let info = JoinInfoBuilder::new(overrides)
            .build(&two_node_store())
            .await
            .unwrap();
        assert_eq!(info.params.votes, 0);
    }

    #[tokio::test]
    async fn test_aliases_stop_on_repeated_value() {
        // The store answers the same value for indices past the end of a
        // one-element list; exactly one alias must be collected.
        let store = two_node_store()
            .with(paths::node_altname_path("127.0.0.1", 1), "alt1")
            .with(paths::node_altname_path("127.0.0.1", 2), "alt1");

        let info = builder_for("127.0.0.1").build(&store).await.unwrap();
        assert_eq!(info.identity.aliases, ["127.0.0.1", "alt1"]);
    }

    #[tokio::test]
    async fn test_aliases_cap_at_maximum() {
        let mut store = two_node_store();
        for i in 1..=20 {
            store = store.with(
                paths::node_altname_path("127.0.0.1", i),
                format!("alt{}", i),
            );
        }
        let info = builder_for("127.0.0.1").build(&store).await.unwrap();
        assert_eq!(info.identity.aliases.len(), MAX_NODE_ALIASES);
        assert_eq!(info.identity.aliases[0], "127.0.0.1");
        assert_eq!(info.identity.aliases[1], "alt1");
    }

    #[tokio::test]
    async fn test_multicast_defaults_follow_address_family() {
        // IPv4 canonical name
        let info = builder_for("127.0.0.1")
            .build(&two_node_store())
            .await
            .unwrap();
        assert_eq!(info.params.multicast_address.as_deref(), Some(DEFAULT_MCAST_V4));

        // IPv6 canonical name
        let store = MemoryConfigStore::new()
            .with("/cluster/@name", "alpha")
            .with("/cluster/nodes/node[1]/@name", "::1")
            .with(paths::node_name_by_name("::1"), "::1");
        let info = builder_for("::1").build(&store).await.unwrap();
        assert_eq!(info.params.multicast_address.as_deref(), Some(DEFAULT_MCAST_V6));

        // Unresolvable canonical name: no derivable default
        let store = MemoryConfigStore::new()
            .with("/cluster/@name", "alpha")
            .with("/cluster/nodes/node[1]/@name", "no-such-host.invalid")
            .with(
                paths::node_name_by_name("no-such-host.invalid"),
                "no-such-host.invalid",
            );
        let info = builder_for("no-such-host.invalid").build(&store).await.unwrap();
        assert_eq!(info.params.multicast_address, None);
    }

    #[tokio::test]
    async fn test_configured_multicast_wins_over_default() {
        let store = two_node_store().with("/cluster/quorum/multicast/@addr", "239.1.2.3");
        let info = builder_for("127.0.0.1").build(&store).await.unwrap();
        assert_eq!(info.params.multicast_address.as_deref(), Some("239.1.2.3"));
    }

    #[tokio::test]
    async fn test_two_node_mode_accepts_two_equal_nodes() {
        let store = two_node_store().with("/cluster/quorum/@two_node", "1");
        let info = builder_for("127.0.0.1").build(&store).await.unwrap();
        assert!(info.params.two_node);
        assert_eq!(info.params.expected_votes, 2);
    }

    #[tokio::test]
    async fn test_two_node_mode_rejects_unequal_votes() {
        let store = two_node_store()
            .with("/cluster/quorum/@two_node", "1")
            .with(paths::node_votes_path("127.0.0.2"), "2");
        let err = builder_for("127.0.0.1").build(&store).await.unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::TwoNodeConstraintViolation { .. }
        ));
    }

    #[tokio::test]
    async fn test_two_node_mode_rejects_three_nodes() {
        let store = two_node_store()
            .with("/cluster/quorum/@two_node", "1")
            .with("/cluster/nodes/node[3]/@name", "127.0.0.3")
            .with(paths::node_name_by_name("127.0.0.3"), "127.0.0.3");
        let err = builder_for("127.0.0.1").build(&store).await.unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::TwoNodeConstraintViolation { node_count: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_two_node_mode_requires_one_local_vote() {
        let store = two_node_store()
            .with("/cluster/quorum/@two_node", "1")
            // The sum still comes to 2, but this node holds both votes.
            .with(paths::node_votes_path("127.0.0.1"), "2")
            .with(paths::node_votes_path("127.0.0.2"), "0");
        let err = builder_for("127.0.0.1").build(&store).await.unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::TwoNodeConstraintViolation { local_votes: 2, .. }
        ));
    }

    /// Store wrapper that records every queried path
    #[derive(Clone)]
    struct RecordingStore {
        inner: MemoryConfigStore,
        queries: Arc<Mutex<Vec<String>>>,
    }

    struct RecordingConnection {
        inner: Box<dyn ConfigConnection>,
        queries: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ConfigStore for RecordingStore {
        async fn connect(
            &self,
            cluster_name: Option<&str>,
        ) -> Result<Box<dyn ConfigConnection>, BootstrapError> {
            Ok(Box::new(RecordingConnection {
                inner: self.inner.connect(cluster_name).await?,
                queries: self.queries.clone(),
            }))
        }
    }

    #[async_trait]
    impl ConfigConnection for RecordingConnection {
        async fn get(&self, path: &str) -> Option<String> {
            self.queries.lock().unwrap().push(path.to_string());
            self.inner.get(path).await
        }
    }

    #[tokio::test]
    async fn test_overrides_skip_the_corresponding_store_queries() {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let store = RecordingStore {
            inner: two_node_store()
                .with("/cluster/quorum/@port", "7110")
                .with(paths::node_votes_path("127.0.0.1"), "3"),
            queries: queries.clone(),
        };

        let overrides = JoinOverrides {
            node_name: Some("127.0.0.1".to_string()),
            expected_votes: Some(2),
            port: Some(9000),
            votes: Some(1),
            node_id: Some(5),
            multicast_address: Some("239.9.9.9".to_string()),
            ..Default::default()
        };
        let info = JoinInfoBuilder::new(overrides).build(&store).await.unwrap();

        assert_eq!(info.params.port, 9000);
        assert_eq!(info.params.votes, 1);
        assert_eq!(info.params.expected_votes, 2);
        assert_eq!(info.node_id, Some(5));
        assert_eq!(info.params.multicast_address.as_deref(), Some("239.9.9.9"));

        let queries = queries.lock().unwrap();
        assert!(!queries.iter().any(|p| p == paths::PORT_PATH));
        assert!(!queries.iter().any(|p| p == paths::EXPECTED_VOTES_PATH));
        assert!(!queries.iter().any(|p| p == paths::MCAST_ADDR_PATH));
        assert!(!queries.iter().any(|p| p == &paths::node_votes_path("127.0.0.1")));
        assert!(!queries.iter().any(|p| p == &paths::node_id_path("127.0.0.1")));
        // The vote-sum enumeration is skipped wholesale with the override set.
        assert!(!queries.iter().any(|p| p == &paths::node_votes_path("127.0.0.2")));
    }
}

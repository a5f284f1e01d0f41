//! Hand-off to the membership transport
//!
//! Thin by design: everything here was derived and validated by the
//! builder; the invoker only feeds it to the membership layer in order.

use async_trait::async_trait;

use tracing::info;

use quorumboot_api::model::{JoinInfo, JoinParameters};

/// The membership/transport join primitive
///
/// Implementations live outside this crate (the membership engine's RPC
/// surface); their errors are foreign and absorbed as-is.
#[async_trait]
pub trait MembershipTransport: Send + Sync {
    async fn set_node_name(&self, name: &str) -> anyhow::Result<()>;

    async fn set_node_id(&self, node_id: u32) -> anyhow::Result<()>;

    /// Bind one local interface by the host name it carries
    async fn add_interface(&self, name: &str) -> anyhow::Result<()>;

    async fn set_multicast(&self, addr: &str) -> anyhow::Result<()>;

    async fn join_cluster(&self, params: &JoinParameters) -> anyhow::Result<()>;
}

/// Hands one derived parameter set to the membership layer
pub struct JoinInvoker;

impl JoinInvoker {
    pub async fn invoke(
        transport: &dyn MembershipTransport,
        info: &JoinInfo,
    ) -> anyhow::Result<()> {
        transport
            .set_node_name(&info.identity.local_node_name)
            .await?;
        if let Some(node_id) = info.node_id {
            transport.set_node_id(node_id).await?;
        }

        for name in &info.identity.aliases {
            transport.add_interface(name).await?;
        }
        if let Some(addr) = &info.params.multicast_address {
            transport.set_multicast(addr).await?;
        }

        info!("joining cluster {}", info.params.cluster_name);
        transport.join_cluster(&info.params).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use quorumboot_api::model::ClusterIdentity;

    use super::*;

    #[derive(Default)]
    struct RecordingTransport {
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl MembershipTransport for RecordingTransport {
        async fn set_node_name(&self, name: &str) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(format!("name:{}", name));
            Ok(())
        }

        async fn set_node_id(&self, node_id: u32) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(format!("id:{}", node_id));
            Ok(())
        }

        async fn add_interface(&self, name: &str) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(format!("if:{}", name));
            Ok(())
        }

        async fn set_multicast(&self, addr: &str) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(format!("mcast:{}", addr));
            Ok(())
        }

        async fn join_cluster(&self, params: &JoinParameters) -> anyhow::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("join:{}", params.cluster_name));
            Ok(())
        }
    }

    fn join_info() -> JoinInfo {
        JoinInfo {
            identity: ClusterIdentity {
                cluster_name: "alpha".to_string(),
                local_node_name: "node1".to_string(),
                aliases: vec!["node1".to_string(), "node1-alt".to_string()],
            },
            node_id: Some(7),
            params: JoinParameters {
                cluster_name: "alpha".to_string(),
                local_node_name: "node1".to_string(),
                votes: 1,
                expected_votes: 2,
                port: 6809,
                multicast_address: Some("239.192.9.1".to_string()),
                key_file: None,
                two_node: false,
            },
        }
    }

    #[tokio::test]
    async fn test_invoke_feeds_transport_in_order() {
        let transport = RecordingTransport::default();
        JoinInvoker::invoke(&transport, &join_info()).await.unwrap();

        let calls = transport.calls.lock().unwrap();
        assert_eq!(
            *calls,
            [
                "name:node1",
                "id:7",
                "if:node1",
                "if:node1-alt",
                "mcast:239.192.9.1",
                "join:alpha"
            ]
        );
    }

    #[tokio::test]
    async fn test_invoke_skips_absent_optionals() {
        let transport = RecordingTransport::default();
        let mut info = join_info();
        info.node_id = None;
        info.params.multicast_address = None;
        JoinInvoker::invoke(&transport, &info).await.unwrap();

        let calls = transport.calls.lock().unwrap();
        assert!(!calls.iter().any(|c| c.starts_with("id:")));
        assert!(!calls.iter().any(|c| c.starts_with("mcast:")));
        assert_eq!(calls.last().map(String::as_str), Some("join:alpha"));
    }
}

//! Quorumboot Core - Cluster bootstrap logic
//!
//! This crate provides:
//! - Node registry loading from the configuration store
//! - Local node identity resolution
//! - Join parameter derivation with environment overrides
//! - Hand-off of the derived parameters to the membership transport
//!
//! The whole subsystem runs once at node startup, and the registry pass runs
//! again on a reread-config trigger, before any membership traffic is sent.

pub mod model;
pub mod service;

// Re-export commonly used types
pub use model::JoinOverrides;
pub use service::{
    Bootstrap, IdentityResolver, JoinInfoBuilder, JoinInvoker, MembershipTransport,
    NodeRegistryLoader,
};

// Re-export boundary types
pub use quorumboot_api::model::{JoinInfo, JoinParameters, NodeRegistry};
pub use quorumboot_common::BootstrapError;

//! AKS gateway
//!
//! Exposes AKS cluster introspection over Azure Resource Manager: cluster
//! lookup, and resolution of the network resources a cluster depends on.

pub mod azure;
pub mod config;
pub mod handlers;

/// Version injected at compile time via AKS_GATEWAY_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("AKS_GATEWAY_VERSION") {
    Some(v) => v,
    None => "dev",
};

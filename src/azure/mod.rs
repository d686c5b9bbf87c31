//! Azure Resource Manager integration
//!
//! This module turns a cluster identity into resolved, cached ARM clients and
//! network resources.
//!
//! # Module Structure
//!
//! - [`resource_id`] - Canonical resource ID parsing
//! - [`cache`] - Response cache contract and the in-memory implementation
//! - [`pool`] - Per-subscription client pool with lazy, single construction
//! - [`topology`] - Cluster to subnet to NSG / route table / load balancer resolution
//! - [`client`] - Cached lookups for clusters and network resources
//! - [`arm`] - Per-category ARM REST clients
//! - [`auth`] - Bearer token caching over a pluggable provider
//! - [`http`] - HTTP transport
//! - [`models`] - ARM resource models
//!
//! # Example
//!
//! ```ignore
//! use aks_gateway::azure::{AzureClient, DependencyKind, ResourceIdentifier};
//!
//! async fn nsg_of(client: &AzureClient, id: &str) -> anyhow::Result<Option<String>> {
//!     let cluster = client.get_cluster(&ResourceIdentifier::parse_cluster(id)?).await?;
//!     Ok(client
//!         .resolver()
//!         .resolve_dependency(&cluster, DependencyKind::NetworkSecurityGroup)
//!         .await?)
//! }
//! ```

pub mod arm;
pub mod auth;
pub mod cache;
pub mod client;
pub mod error;
pub mod http;
pub mod models;
pub mod pool;
pub mod resource_id;
pub mod topology;

pub use auth::{AzureCredentials, StaticTokenProvider, TokenProvider};
pub use cache::{cache_key, AzureCache, CacheValue, NoopCache, ResponseCache};
pub use client::{ArmResource, AzureClient};
pub use error::{ApiError, ConstructionError, Hop, ResolutionError, ResourceIdError};
pub use http::ArmHttpClient;
pub use pool::{ArmClientFactory, ClientFactory, SubscriptionClientPool};
pub use resource_id::{ResourceIdentifier, ResourceType};
pub use topology::{DependencyKind, NetworkTopology, NetworkTopologyResolver};

//! Network topology resolution
//!
//! Walks from a managed cluster to the network resources it depends on:
//! node pool subnet, then the subnet's virtual network, network security
//! group, route table or internal load balancer.
//!
//! Resolution outcomes are three-way:
//! - `Ok(Some(id))` - the dependency exists
//! - `Ok(None)` - the cluster legitimately has no such dependency
//! - `Err(_)` - the dependency could not be determined
//!
//! Only fully resolved IDs are written to the cache, right before returning.
//! A caller that drops the future (or hits a hop timeout) leaves the cache
//! untouched.

use super::cache::{cache_key, CacheValue, ResponseCache};
use super::error::{ApiError, Hop, ResolutionError};
use super::models::{ManagedCluster, Subnet};
use super::pool::SubscriptionClientPool;
use super::resource_id::{ResourceIdentifier, LOAD_BALANCER_FRONTEND, SUBNET};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on a single remote hop
pub const DEFAULT_HOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cache prefix of full subnet documents, shared with the client facade
pub(crate) const SUBNET_CACHE_PREFIX: &str = "subnet";

/// Names of the load balancers AKS provisions in the node resource group
pub const AKS_LOAD_BALANCER_NAMES: &[&str] = &["kubernetes", "kubernetes-internal"];

/// A network dependency reachable from the cluster's subnet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    VirtualNetwork,
    NetworkSecurityGroup,
    RouteTable,
    LoadBalancer,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 4] = [
        DependencyKind::VirtualNetwork,
        DependencyKind::NetworkSecurityGroup,
        DependencyKind::RouteTable,
        DependencyKind::LoadBalancer,
    ];

    /// Prefix of the cache key; the subject is the subnet ID
    pub fn cache_prefix(&self) -> &'static str {
        match self {
            DependencyKind::VirtualNetwork => "subnet-vnet",
            DependencyKind::NetworkSecurityGroup => "subnet-nsg",
            DependencyKind::RouteTable => "subnet-routetable",
            DependencyKind::LoadBalancer => "subnet-lb",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DependencyKind::VirtualNetwork => "virtual network",
            DependencyKind::NetworkSecurityGroup => "network security group",
            DependencyKind::RouteTable => "route table",
            DependencyKind::LoadBalancer => "load balancer",
        }
    }
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A dependency that failed to resolve during a topology walk
#[derive(Debug, Clone, Serialize)]
pub struct TopologyFailure {
    pub kind: DependencyKind,
    pub error: String,
}

/// Everything resolvable from one cluster
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkTopology {
    pub subnet_id: Option<String>,
    pub virtual_network_id: Option<String>,
    pub network_security_group_id: Option<String>,
    pub route_table_id: Option<String>,
    pub load_balancer_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<TopologyFailure>,
}

impl NetworkTopology {
    fn slot(&mut self, kind: DependencyKind) -> &mut Option<String> {
        match kind {
            DependencyKind::VirtualNetwork => &mut self.virtual_network_id,
            DependencyKind::NetworkSecurityGroup => &mut self.network_security_group_id,
            DependencyKind::RouteTable => &mut self.route_table_id,
            DependencyKind::LoadBalancer => &mut self.load_balancer_id,
        }
    }
}

/// Resolves a cluster's network dependencies through the client pool and cache
#[derive(Clone)]
pub struct NetworkTopologyResolver {
    pool: Arc<SubscriptionClientPool>,
    cache: Arc<dyn ResponseCache>,
    hop_timeout: Duration,
}

impl NetworkTopologyResolver {
    pub fn new(pool: Arc<SubscriptionClientPool>, cache: Arc<dyn ResponseCache>) -> Self {
        Self {
            pool,
            cache,
            hop_timeout: DEFAULT_HOP_TIMEOUT,
        }
    }

    pub fn with_hop_timeout(mut self, hop_timeout: Duration) -> Self {
        self.hop_timeout = hop_timeout;
        self
    }

    /// Resolve one dependency of `cluster`.
    /// A cache miss costs at most one remote subnet lookup.
    pub async fn resolve_dependency(
        &self,
        cluster: &ManagedCluster,
        kind: DependencyKind,
    ) -> Result<Option<String>, ResolutionError> {
        validate_cluster(cluster)?;

        let Some(subnet_id) = cluster.first_subnet_id() else {
            tracing::debug!("No node pool declares a subnet; no {} to resolve", kind);
            return Ok(None);
        };

        self.resolve_for_subnet(subnet_id, kind, &mut None).await
    }

    /// Resolve `kind` for a subnet, reusing `fetched` when an earlier kind
    /// already loaded the subnet document
    async fn resolve_for_subnet(
        &self,
        subnet_id: &str,
        kind: DependencyKind,
        fetched: &mut Option<Arc<Subnet>>,
    ) -> Result<Option<String>, ResolutionError> {
        let key = cache_key(kind.cache_prefix(), subnet_id);
        if let Some(cached) = self.cache.get(&key).await {
            let found = cached.kind();
            match cached.into_resource_id() {
                Some(id) => return Ok(Some(id)),
                None => tracing::debug!("Ignoring {} cached under {}", found, key),
            }
        }

        let subnet_ref = ResourceIdentifier::parse_as(subnet_id, SUBNET)?;

        let resolved = match kind {
            DependencyKind::VirtualNetwork => subnet_ref.parent().map(|vnet| vnet.full_id),
            _ => {
                let subnet = match fetched.clone() {
                    Some(subnet) => subnet,
                    None => {
                        let subnet = self.fetch_subnet(&subnet_ref).await?;
                        *fetched = Some(subnet.clone());
                        subnet
                    }
                };
                dependency_of(&subnet, kind)
            }
        };

        match &resolved {
            Some(id) => self.cache.set(&key, CacheValue::ResourceId(id.clone())).await,
            None => tracing::debug!("No {} attached to subnet {}", kind, subnet_id),
        }

        Ok(resolved)
    }

    /// The subnet document, from the shared `subnet:` cache entry or one
    /// bounded remote lookup
    async fn fetch_subnet(
        &self,
        subnet_ref: &ResourceIdentifier,
    ) -> Result<Arc<Subnet>, ResolutionError> {
        let key = cache_key(SUBNET_CACHE_PREFIX, &subnet_ref.full_id);
        if let Some(subnet) = self.cache.get(&key).await.and_then(CacheValue::into_subnet) {
            return Ok(subnet);
        }

        let clients = self.pool.get_or_create(&subnet_ref.subscription_id).await?;

        let subnet_name = subnet_ref.sub_resource_name.as_deref().unwrap_or_default();
        let subnet = Arc::new(
            self.bounded(
                Hop::SubnetFetch,
                &subnet_ref.full_id,
                clients
                    .subnets
                    .get(&subnet_ref.resource_group, &subnet_ref.resource_name, subnet_name),
            )
            .await?,
        );

        self.cache.set(&key, CacheValue::Subnet(subnet.clone())).await;
        Ok(subnet)
    }

    /// IDs of the standard AKS load balancers in the node resource group.
    /// An empty list is a valid answer.
    pub async fn cluster_load_balancers(
        &self,
        cluster: &ManagedCluster,
    ) -> Result<Vec<String>, ResolutionError> {
        validate_cluster(cluster)?;

        let cluster_ref = ResourceIdentifier::parse_cluster(cluster.id.as_deref().unwrap_or_default())?;
        let Some(node_rg) = cluster.node_resource_group() else {
            return Ok(Vec::new());
        };

        let clients = self.pool.get_or_create(&cluster_ref.subscription_id).await?;
        let subject = format!(
            "/subscriptions/{}/resourceGroups/{}",
            cluster_ref.subscription_id, node_rg
        );

        let listed = self
            .bounded(
                Hop::DependencyFetch,
                &subject,
                clients.load_balancers.list_by_resource_group(node_rg),
            )
            .await;

        let balancers = match listed {
            Ok(balancers) => balancers,
            Err(ResolutionError::DependencyFetch { source, .. }) if source.is_not_found() => {
                tracing::debug!("Node resource group {} not found", node_rg);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        Ok(balancers
            .into_iter()
            .filter(|lb| {
                lb.0.name
                    .as_deref()
                    .is_some_and(|name| AKS_LOAD_BALANCER_NAMES.contains(&name))
            })
            .filter_map(|lb| lb.0.id)
            .collect())
    }

    /// Resolve every dependency kind. Per-kind failures are logged and
    /// recorded; they do not abort the walk. The subnet is fetched at most
    /// once, and a failed fetch is not retried for the remaining kinds.
    pub async fn resolve_topology(
        &self,
        cluster: &ManagedCluster,
    ) -> Result<NetworkTopology, ResolutionError> {
        validate_cluster(cluster)?;

        let mut topology = NetworkTopology {
            subnet_id: cluster.first_subnet_id().map(str::to_string),
            ..Default::default()
        };
        let Some(subnet_id) = cluster.first_subnet_id() else {
            return Ok(topology);
        };

        let mut fetched = None;
        let mut subnet_failure: Option<String> = None;

        for kind in DependencyKind::ALL {
            if let (Some(error), true) = (&subnet_failure, kind != DependencyKind::VirtualNetwork) {
                topology.failures.push(TopologyFailure {
                    kind,
                    error: error.clone(),
                });
                continue;
            }

            match self.resolve_for_subnet(subnet_id, kind, &mut fetched).await {
                Ok(id) => *topology.slot(kind) = id,
                Err(e) => {
                    tracing::warn!("Failed to resolve {}: {}", kind, e);
                    if e.hop() == Some(Hop::SubnetFetch) {
                        subnet_failure = Some(e.to_string());
                    }
                    topology.failures.push(TopologyFailure {
                        kind,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(topology)
    }

    /// Run a remote call under the hop timeout, tagging failures with the hop
    pub(crate) async fn bounded<T>(
        &self,
        hop: Hop,
        subject: &str,
        call: impl Future<Output = Result<T, ApiError>>,
    ) -> Result<T, ResolutionError> {
        match tokio::time::timeout(self.hop_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(match hop {
                Hop::SubnetFetch => ResolutionError::SubnetFetch {
                    subnet_id: subject.to_string(),
                    source,
                },
                Hop::DependencyFetch => ResolutionError::DependencyFetch {
                    resource_id: subject.to_string(),
                    source,
                },
            }),
            Err(_) => Err(ResolutionError::Timeout {
                hop,
                subject: subject.to_string(),
                timeout: self.hop_timeout,
            }),
        }
    }
}

/// Pick one dependency out of a subnet document
fn dependency_of(subnet: &Subnet, kind: DependencyKind) -> Option<String> {
    match kind {
        DependencyKind::NetworkSecurityGroup => {
            subnet.network_security_group_id().map(str::to_string)
        }
        DependencyKind::RouteTable => subnet.route_table_id().map(str::to_string),
        DependencyKind::LoadBalancer => subnet
            .ip_configuration_ids()
            .filter_map(|id| ResourceIdentifier::parse_as(id, LOAD_BALANCER_FRONTEND).ok())
            .find_map(|frontend| frontend.parent())
            .map(|lb| lb.full_id),
        DependencyKind::VirtualNetwork => subnet
            .id
            .as_deref()
            .and_then(|id| ResourceIdentifier::parse_as(id, SUBNET).ok())
            .and_then(|subnet| subnet.parent())
            .map(|vnet| vnet.full_id),
    }
}

/// A cluster must carry properties and an `agentPoolProfiles` field.
/// A present but empty pool list is valid and resolves to nothing; only a
/// missing field means the node pool metadata was never populated.
fn validate_cluster(cluster: &ManagedCluster) -> Result<(), ResolutionError> {
    let Some(properties) = cluster.properties.as_ref() else {
        return Err(ResolutionError::InvalidCluster(
            "cluster has no properties".to_string(),
        ));
    };
    if properties.agent_pool_profiles.is_none() {
        return Err(ResolutionError::InvalidCluster(format!(
            "cluster {} has no node pool metadata",
            cluster.name.as_deref().unwrap_or("<unnamed>")
        )));
    }
    Ok(())
}

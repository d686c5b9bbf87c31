//! Azure Client
//!
//! Cached lookups of clusters and network resources, combining the
//! subscription client pool, the response cache and the topology resolver.

use super::cache::{cache_key, CacheValue, ResponseCache};
use super::error::ApiError;
use super::models::{
    LoadBalancer, ManagedCluster, NetworkSecurityGroup, RouteTable, Subnet, VirtualNetwork,
};
use super::pool::SubscriptionClientPool;
use super::resource_id::{
    ResourceIdentifier, LOAD_BALANCER, MANAGED_CLUSTER, NETWORK_SECURITY_GROUP, ROUTE_TABLE,
    SUBNET, VIRTUAL_NETWORK,
};
use super::topology::{NetworkTopologyResolver, SUBNET_CACHE_PREFIX};
use anyhow::{Context, Result};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Any resource `get_resource_by_id` can return
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ArmResource {
    Cluster(Arc<ManagedCluster>),
    VirtualNetwork(Arc<VirtualNetwork>),
    Subnet(Arc<Subnet>),
    RouteTable(Arc<RouteTable>),
    SecurityGroup(Arc<NetworkSecurityGroup>),
    LoadBalancer(Arc<LoadBalancer>),
}

/// Main Azure client
#[derive(Clone)]
pub struct AzureClient {
    pool: Arc<SubscriptionClientPool>,
    cache: Arc<dyn ResponseCache>,
    resolver: NetworkTopologyResolver,
}

impl AzureClient {
    pub fn new(pool: Arc<SubscriptionClientPool>, cache: Arc<dyn ResponseCache>) -> Self {
        let resolver = NetworkTopologyResolver::new(pool.clone(), cache.clone());
        Self {
            pool,
            cache,
            resolver,
        }
    }

    /// Bound every remote hop the resolver makes
    pub fn with_hop_timeout(mut self, hop_timeout: Duration) -> Self {
        self.resolver = self.resolver.with_hop_timeout(hop_timeout);
        self
    }

    pub fn pool(&self) -> &Arc<SubscriptionClientPool> {
        &self.pool
    }

    pub fn cache(&self) -> &Arc<dyn ResponseCache> {
        &self.cache
    }

    pub fn resolver(&self) -> &NetworkTopologyResolver {
        &self.resolver
    }

    /// Serve from cache or fetch and store
    async fn cached<T, Fut>(
        &self,
        key: String,
        unwrap: fn(CacheValue) -> Option<Arc<T>>,
        wrap: fn(Arc<T>) -> CacheValue,
        fetch: Fut,
    ) -> Result<Arc<T>>
    where
        Fut: Future<Output = std::result::Result<T, ApiError>>,
    {
        if let Some(hit) = self.cache.get(&key).await.and_then(unwrap) {
            return Ok(hit);
        }

        let value = Arc::new(fetch.await?);
        self.cache.set(&key, wrap(value.clone())).await;
        Ok(value)
    }

    // =========================================================================
    // Clusters
    // =========================================================================

    /// Get an AKS cluster, from cache when possible
    pub async fn get_cluster(&self, cluster: &ResourceIdentifier) -> Result<Arc<ManagedCluster>> {
        anyhow::ensure!(
            MANAGED_CLUSTER.matches(cluster),
            "{} is not an AKS cluster",
            cluster
        );
        let clients = self.pool.get_or_create(&cluster.subscription_id).await?;

        self.cached(
            cache_key("cluster", &cluster.full_id),
            CacheValue::into_cluster,
            CacheValue::Cluster,
            clients
                .container_service
                .get(&cluster.resource_group, &cluster.resource_name),
        )
        .await
        .context("Failed to get AKS cluster")
    }

    /// Forget a cached cluster so the next read goes to ARM
    pub async fn invalidate_cluster(&self, cluster: &ResourceIdentifier) {
        self.cache
            .delete(&cache_key("cluster", &cluster.full_id))
            .await;
    }

    /// List AKS clusters in a subscription, optionally within one resource group
    pub async fn list_clusters(
        &self,
        subscription_id: &str,
        resource_group: Option<&str>,
    ) -> Result<Arc<Vec<ManagedCluster>>> {
        let clients = self.pool.get_or_create(subscription_id).await?;

        let key = match resource_group {
            Some(rg) => format!("clusters:sub:{}:rg:{}", subscription_id, rg),
            None => format!("clusters:sub:{}", subscription_id),
        };

        let fetch = async {
            match resource_group {
                Some(rg) => clients.container_service.list_by_resource_group(rg).await,
                None => clients.container_service.list().await,
            }
        };

        self.cached(key, CacheValue::into_clusters, CacheValue::Clusters, fetch)
            .await
            .context("Failed to list AKS clusters")
    }

    // =========================================================================
    // Network resources
    // =========================================================================

    pub async fn get_virtual_network(&self, id: &str) -> Result<Arc<VirtualNetwork>> {
        let id = ResourceIdentifier::parse_as(id, VIRTUAL_NETWORK)?;
        let clients = self.pool.get_or_create(&id.subscription_id).await?;

        self.cached(
            cache_key("vnet", &id.full_id),
            CacheValue::into_virtual_network,
            CacheValue::VirtualNetwork,
            clients
                .virtual_networks
                .get(&id.resource_group, &id.resource_name),
        )
        .await
        .context("Failed to get VNet details")
    }

    pub async fn get_subnet(&self, id: &str) -> Result<Arc<Subnet>> {
        let id = ResourceIdentifier::parse_as(id, SUBNET)?;
        let clients = self.pool.get_or_create(&id.subscription_id).await?;
        let subnet_name = id.sub_resource_name.as_deref().unwrap_or_default();

        self.cached(
            cache_key(SUBNET_CACHE_PREFIX, &id.full_id),
            CacheValue::into_subnet,
            CacheValue::Subnet,
            clients
                .subnets
                .get(&id.resource_group, &id.resource_name, subnet_name),
        )
        .await
        .context("Failed to get subnet details")
    }

    pub async fn get_route_table(&self, id: &str) -> Result<Arc<RouteTable>> {
        let id = ResourceIdentifier::parse_as(id, ROUTE_TABLE)?;
        let clients = self.pool.get_or_create(&id.subscription_id).await?;

        self.cached(
            cache_key("routetable", &id.full_id),
            CacheValue::into_route_table,
            CacheValue::RouteTable,
            clients.route_tables.get(&id.resource_group, &id.resource_name),
        )
        .await
        .context("Failed to get route table details")
    }

    pub async fn get_network_security_group(&self, id: &str) -> Result<Arc<NetworkSecurityGroup>> {
        let id = ResourceIdentifier::parse_as(id, NETWORK_SECURITY_GROUP)?;
        let clients = self.pool.get_or_create(&id.subscription_id).await?;

        self.cached(
            cache_key("nsg", &id.full_id),
            CacheValue::into_security_group,
            CacheValue::SecurityGroup,
            clients
                .security_groups
                .get(&id.resource_group, &id.resource_name),
        )
        .await
        .context("Failed to get NSG details")
    }

    pub async fn get_load_balancer(&self, id: &str) -> Result<Arc<LoadBalancer>> {
        let id = ResourceIdentifier::parse_as(id, LOAD_BALANCER)?;
        let clients = self.pool.get_or_create(&id.subscription_id).await?;

        self.cached(
            cache_key("lb", &id.full_id),
            CacheValue::into_load_balancer,
            CacheValue::LoadBalancer,
            clients
                .load_balancers
                .get(&id.resource_group, &id.resource_name),
        )
        .await
        .context("Failed to get load balancer details")
    }

    /// Fetch any supported resource by its ID
    pub async fn get_resource_by_id(&self, resource_id: &str) -> Result<ArmResource> {
        let parsed = ResourceIdentifier::parse(resource_id).context("Failed to parse resource ID")?;

        if MANAGED_CLUSTER.matches(&parsed) {
            Ok(ArmResource::Cluster(self.get_cluster(&parsed).await?))
        } else if VIRTUAL_NETWORK.matches(&parsed) {
            Ok(ArmResource::VirtualNetwork(
                self.get_virtual_network(&parsed.full_id).await?,
            ))
        } else if SUBNET.matches(&parsed) {
            Ok(ArmResource::Subnet(self.get_subnet(&parsed.full_id).await?))
        } else if ROUTE_TABLE.matches(&parsed) {
            Ok(ArmResource::RouteTable(
                self.get_route_table(&parsed.full_id).await?,
            ))
        } else if NETWORK_SECURITY_GROUP.matches(&parsed) {
            Ok(ArmResource::SecurityGroup(
                self.get_network_security_group(&parsed.full_id).await?,
            ))
        } else if LOAD_BALANCER.matches(&parsed) {
            Ok(ArmResource::LoadBalancer(
                self.get_load_balancer(&parsed.full_id).await?,
            ))
        } else {
            anyhow::bail!("unsupported resource type: {}", parsed.qualified_type())
        }
    }
}

//! ARM resource clients
//!
//! One client per resource category, each bound to a single subscription.
//! Clients are cheap to clone and immutable once built.

use super::auth::AzureCredentials;
use super::error::{ApiError, ConstructionError};
use super::http::ArmHttpClient;
use super::models::{
    ListPage, LoadBalancer, ManagedCluster, NetworkSecurityGroup, RouteTable, Subnet,
    VirtualNetwork,
};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use url::Url;

/// API version for Microsoft.ContainerService
pub const CONTAINER_SERVICE_API_VERSION: &str = "2024-05-01";

/// API version for Microsoft.Network
pub const NETWORK_API_VERSION: &str = "2024-05-01";

/// Shared plumbing for the per-category clients
#[derive(Clone)]
pub struct ArmResourceClient {
    subscription_id: String,
    base_url: String,
    api_version: &'static str,
    credentials: AzureCredentials,
    http: ArmHttpClient,
}

impl ArmResourceClient {
    pub fn new(
        client: &'static str,
        subscription_id: &str,
        credentials: &AzureCredentials,
        http: &ArmHttpClient,
        api_version: &'static str,
    ) -> Result<Self, ConstructionError> {
        validate_subscription(subscription_id)?;

        let endpoint = http.endpoint();
        if endpoint.cannot_be_a_base() {
            return Err(ConstructionError::InvalidEndpoint {
                client,
                subscription_id: subscription_id.to_string(),
                reason: format!("{} cannot be used as a base URL", endpoint),
            });
        }
        let base_url = endpoint
            .join(&format!(
                "subscriptions/{}/",
                urlencoding::encode(subscription_id)
            ))
            .map_err(|e| ConstructionError::InvalidEndpoint {
                client,
                subscription_id: subscription_id.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            subscription_id: subscription_id.to_string(),
            base_url: base_url.to_string(),
            api_version,
            credentials: credentials.clone(),
            http: http.clone(),
        })
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// URL of a path below the subscription, with the api-version applied
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}{}?api-version={}",
            self.base_url, path, self.api_version
        )
    }

    async fn token(&self) -> Result<String, ApiError> {
        self.credentials
            .get_token()
            .await
            .map_err(|e| ApiError::Credential(e.to_string()))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let token = self.token().await?;
        self.http.get_json(&self.url(path), &token).await
    }

    /// Fetch every page of a list call
    pub async fn list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let token = self.token().await?;
        let mut items = Vec::new();
        let mut next = Some(self.url(path));

        let mut visited = HashSet::new();

        while let Some(url) = next {
            let page: ListPage<T> = self.http.get_json(&url, &token).await?;
            items.extend(page.value);
            visited.insert(url);

            next = match page.next_link.filter(|link| !link.is_empty()) {
                Some(link) => Some(self.checked_next_link(link, &visited)?),
                None => None,
            };
        }

        Ok(items)
    }

    /// The bearer token goes with every page, so a continuation link must
    /// stay on the configured endpoint and must not revisit a page
    fn checked_next_link(
        &self,
        link: String,
        visited: &HashSet<String>,
    ) -> Result<String, ApiError> {
        let parsed = Url::parse(&link).map_err(|e| ApiError::Paging {
            link: link.clone(),
            reason: e.to_string(),
        })?;

        let endpoint = self.http.endpoint();
        if parsed.origin() != endpoint.origin() {
            return Err(ApiError::Paging {
                reason: format!(
                    "origin differs from ARM endpoint {}",
                    endpoint.origin().ascii_serialization()
                ),
                link,
            });
        }

        if visited.contains(&link) {
            return Err(ApiError::Paging {
                link,
                reason: "page was already fetched".to_string(),
            });
        }

        Ok(link)
    }
}

fn validate_subscription(subscription_id: &str) -> Result<(), ConstructionError> {
    if subscription_id.trim().is_empty() {
        return Err(ConstructionError::EmptySubscription);
    }
    if let Some(c) = subscription_id
        .chars()
        .find(|c| matches!(c, '/' | '?' | '#') || c.is_whitespace())
    {
        return Err(ConstructionError::InvalidSubscription {
            subscription_id: subscription_id.to_string(),
            reason: format!("contains {:?}", c),
        });
    }
    Ok(())
}

fn seg(s: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(s)
}

// =============================================================================
// Container Service
// =============================================================================

#[derive(Clone)]
pub struct ManagedClustersClient {
    inner: ArmResourceClient,
}

impl ManagedClustersClient {
    pub fn new(
        subscription_id: &str,
        credentials: &AzureCredentials,
        http: &ArmHttpClient,
    ) -> Result<Self, ConstructionError> {
        Ok(Self {
            inner: ArmResourceClient::new(
                "container service",
                subscription_id,
                credentials,
                http,
                CONTAINER_SERVICE_API_VERSION,
            )?,
        })
    }

    pub async fn get(&self, resource_group: &str, name: &str) -> Result<ManagedCluster, ApiError> {
        self.inner
            .get(&format!(
                "resourceGroups/{}/providers/Microsoft.ContainerService/managedClusters/{}",
                seg(resource_group),
                seg(name)
            ))
            .await
    }

    pub async fn list_by_resource_group(
        &self,
        resource_group: &str,
    ) -> Result<Vec<ManagedCluster>, ApiError> {
        self.inner
            .list(&format!(
                "resourceGroups/{}/providers/Microsoft.ContainerService/managedClusters",
                seg(resource_group)
            ))
            .await
    }

    pub async fn list(&self) -> Result<Vec<ManagedCluster>, ApiError> {
        self.inner
            .list("providers/Microsoft.ContainerService/managedClusters")
            .await
    }
}

// =============================================================================
// Network
// =============================================================================

/// Declares a client for a top-level Microsoft.Network resource with a `get`
macro_rules! network_client {
    ($client:ident, $label:literal, $segment:literal, $model:ty) => {
        #[derive(Clone)]
        pub struct $client {
            inner: ArmResourceClient,
        }

        impl $client {
            pub fn new(
                subscription_id: &str,
                credentials: &AzureCredentials,
                http: &ArmHttpClient,
            ) -> Result<Self, ConstructionError> {
                Ok(Self {
                    inner: ArmResourceClient::new(
                        $label,
                        subscription_id,
                        credentials,
                        http,
                        NETWORK_API_VERSION,
                    )?,
                })
            }

            pub async fn get(&self, resource_group: &str, name: &str) -> Result<$model, ApiError> {
                self.inner
                    .get(&format!(
                        concat!("resourceGroups/{}/providers/Microsoft.Network/", $segment, "/{}"),
                        seg(resource_group),
                        seg(name)
                    ))
                    .await
            }
        }
    };
}

network_client!(VirtualNetworksClient, "virtual network", "virtualNetworks", VirtualNetwork);
network_client!(RouteTablesClient, "route table", "routeTables", RouteTable);
network_client!(
    SecurityGroupsClient,
    "network security group",
    "networkSecurityGroups",
    NetworkSecurityGroup
);
network_client!(LoadBalancersClient, "load balancer", "loadBalancers", LoadBalancer);

impl LoadBalancersClient {
    pub async fn list_by_resource_group(
        &self,
        resource_group: &str,
    ) -> Result<Vec<LoadBalancer>, ApiError> {
        self.inner
            .list(&format!(
                "resourceGroups/{}/providers/Microsoft.Network/loadBalancers",
                seg(resource_group)
            ))
            .await
    }
}

#[derive(Clone)]
pub struct SubnetsClient {
    inner: ArmResourceClient,
}

impl SubnetsClient {
    pub fn new(
        subscription_id: &str,
        credentials: &AzureCredentials,
        http: &ArmHttpClient,
    ) -> Result<Self, ConstructionError> {
        Ok(Self {
            inner: ArmResourceClient::new(
                "subnets",
                subscription_id,
                credentials,
                http,
                NETWORK_API_VERSION,
            )?,
        })
    }

    pub async fn get(
        &self,
        resource_group: &str,
        vnet_name: &str,
        subnet_name: &str,
    ) -> Result<Subnet, ApiError> {
        self.inner
            .get(&format!(
                "resourceGroups/{}/providers/Microsoft.Network/virtualNetworks/{}/subnets/{}",
                seg(resource_group),
                seg(vnet_name),
                seg(subnet_name)
            ))
            .await
    }
}

/// Every client for one subscription
pub struct SubscriptionClients {
    pub subscription_id: String,
    pub container_service: ManagedClustersClient,
    pub virtual_networks: VirtualNetworksClient,
    pub subnets: SubnetsClient,
    pub route_tables: RouteTablesClient,
    pub security_groups: SecurityGroupsClient,
    pub load_balancers: LoadBalancersClient,
}

impl SubscriptionClients {
    /// Build the full bundle. Fails as a whole if any client fails.
    pub fn new(
        subscription_id: &str,
        credentials: &AzureCredentials,
        http: &ArmHttpClient,
    ) -> Result<Self, ConstructionError> {
        validate_subscription(subscription_id)?;
        credentials
            .validate()
            .map_err(|reason| ConstructionError::Credential {
                subscription_id: subscription_id.to_string(),
                reason,
            })?;

        Ok(Self {
            subscription_id: subscription_id.to_string(),
            container_service: ManagedClustersClient::new(subscription_id, credentials, http)?,
            virtual_networks: VirtualNetworksClient::new(subscription_id, credentials, http)?,
            subnets: SubnetsClient::new(subscription_id, credentials, http)?,
            route_tables: RouteTablesClient::new(subscription_id, credentials, http)?,
            security_groups: SecurityGroupsClient::new(subscription_id, credentials, http)?,
            load_balancers: LoadBalancersClient::new(subscription_id, credentials, http)?,
        })
    }
}

impl std::fmt::Debug for SubscriptionClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionClients")
            .field("subscription_id", &self.subscription_id)
            .finish_non_exhaustive()
    }
}

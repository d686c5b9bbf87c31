//! ARM resource models
//!
//! Only the fields the gateway inspects are typed. Everything else is kept in
//! `extra` so a resource serializes back out the way ARM returned it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reference to another resource (`{"id": "..."}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// One page of a list call
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default)]
    pub next_link: Option<String>,
}

// =============================================================================
// Container Service
// =============================================================================

/// An AKS managed cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagedCluster {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ManagedClusterProperties>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_resource_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_pool_profiles: Option<Vec<AgentPoolProfile>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_profile: Option<NetworkProfile>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A node pool as embedded in the cluster resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(
        rename = "vnetSubnetID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub vnet_subnet_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_plugin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer_sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbound_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ManagedCluster {
    /// Node pools in the order ARM returned them (empty when absent)
    pub fn agent_pools(&self) -> &[AgentPoolProfile] {
        self.properties
            .as_ref()
            .and_then(|p| p.agent_pool_profiles.as_deref())
            .unwrap_or(&[])
    }

    /// Subnet of the first node pool that declares one.
    /// Pools are assumed to share a subnet; later pools are not consulted.
    pub fn first_subnet_id(&self) -> Option<&str> {
        self.agent_pools()
            .iter()
            .filter_map(|pool| pool.vnet_subnet_id.as_deref())
            .find(|id| !id.trim().is_empty())
    }

    pub fn node_resource_group(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.node_resource_group.as_deref())
            .filter(|rg| !rg.is_empty())
    }
}

// =============================================================================
// Network
// =============================================================================

/// A subnet inside a virtual network
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subnet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<SubnetProperties>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_security_group: Option<SubResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_table: Option<SubResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_configurations: Option<Vec<SubResource>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Subnet {
    pub fn network_security_group_id(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.network_security_group.as_ref())
            .and_then(|r| r.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    pub fn route_table_id(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.route_table.as_ref())
            .and_then(|r| r.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// IDs of the IP configurations placed on this subnet
    pub fn ip_configuration_ids(&self) -> impl Iterator<Item = &str> {
        self.properties
            .as_ref()
            .and_then(|p| p.ip_configurations.as_deref())
            .unwrap_or(&[])
            .iter()
            .filter_map(|r| r.id.as_deref())
    }
}

/// A top-level network resource whose properties are passed through untyped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A virtual network
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualNetwork(pub NetworkResource);

/// A route table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTable(pub NetworkResource);

/// A network security group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkSecurityGroup(pub NetworkResource);

/// A load balancer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadBalancer(pub NetworkResource);

//! Tool handlers
//!
//! Thin adapters from a cluster identity to a pretty-printed JSON document.
//! A dependency the cluster does not have yields a `{"message": ...}`
//! document; lookup failures are returned as errors.

use crate::azure::client::AzureClient;
use crate::azure::resource_id::ResourceIdentifier;
use crate::azure::topology::DependencyKind;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;

/// Format a value as an indented JSON string
fn format_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to marshal to JSON")
}

fn not_found(message: &str) -> Result<String> {
    tracing::info!("{}", message);
    format_json(&json!({ "message": message }))
}

/// The cluster resource as returned by ARM
pub async fn cluster_info(client: &AzureClient, cluster: &ResourceIdentifier) -> Result<String> {
    let cluster = client.get_cluster(cluster).await?;
    format_json(cluster.as_ref())
}

/// Clusters in a subscription, optionally narrowed to a resource group
pub async fn list_clusters(
    client: &AzureClient,
    subscription_id: &str,
    resource_group: Option<&str>,
) -> Result<String> {
    let clusters = client.list_clusters(subscription_id, resource_group).await?;
    format_json(clusters.as_ref())
}

/// Resolve one dependency ID of the cluster
async fn dependency_id(
    client: &AzureClient,
    cluster: &ResourceIdentifier,
    kind: DependencyKind,
) -> Result<Option<String>> {
    let cluster = client.get_cluster(cluster).await?;
    let id = client
        .resolver()
        .resolve_dependency(&cluster, kind)
        .await
        .with_context(|| format!("Failed to resolve {}", kind))?;
    Ok(id)
}

pub async fn vnet_info(client: &AzureClient, cluster: &ResourceIdentifier) -> Result<String> {
    let Some(id) = dependency_id(client, cluster, DependencyKind::VirtualNetwork).await? else {
        return not_found("No virtual network found for this AKS cluster");
    };
    format_json(client.get_virtual_network(&id).await?.as_ref())
}

pub async fn subnet_info(client: &AzureClient, cluster: &ResourceIdentifier) -> Result<String> {
    let aks = client.get_cluster(cluster).await?;
    let Some(subnet_id) = aks.first_subnet_id() else {
        return not_found("No subnet found for this AKS cluster");
    };
    format_json(client.get_subnet(subnet_id).await?.as_ref())
}

pub async fn nsg_info(client: &AzureClient, cluster: &ResourceIdentifier) -> Result<String> {
    let Some(id) = dependency_id(client, cluster, DependencyKind::NetworkSecurityGroup).await?
    else {
        return not_found("No network security group found for this AKS cluster");
    };
    format_json(client.get_network_security_group(&id).await?.as_ref())
}

pub async fn route_table_info(client: &AzureClient, cluster: &ResourceIdentifier) -> Result<String> {
    let Some(id) = dependency_id(client, cluster, DependencyKind::RouteTable).await? else {
        return not_found("No route table found for this AKS cluster");
    };
    format_json(client.get_route_table(&id).await?.as_ref())
}

/// The standard AKS load balancers (`kubernetes`, `kubernetes-internal`)
pub async fn load_balancers_info(
    client: &AzureClient,
    cluster: &ResourceIdentifier,
) -> Result<String> {
    let aks = client.get_cluster(cluster).await?;
    let ids = client
        .resolver()
        .cluster_load_balancers(&aks)
        .await
        .context("Failed to get load balancer IDs")?;

    if ids.is_empty() {
        return format_json(&json!({
            "message": "No AKS load balancers (kubernetes/kubernetes-internal) found for this cluster",
            "reason": "This cluster may not have standard AKS load balancers configured, or it may be using a different networking setup."
        }));
    }

    let mut balancers = Vec::with_capacity(ids.len());
    for id in &ids {
        let lb = client
            .get_load_balancer(id)
            .await
            .with_context(|| format!("Failed to get load balancer details for {}", id))?;
        balancers.push(lb);
    }

    if let [only] = balancers.as_slice() {
        return format_json(only.as_ref());
    }

    format_json(&json!({
        "count": balancers.len(),
        "load_balancers": balancers,
    }))
}

/// Every network dependency the cluster has, with per-kind failures listed
pub async fn network_topology(
    client: &AzureClient,
    cluster: &ResourceIdentifier,
) -> Result<String> {
    let aks = client.get_cluster(cluster).await?;
    let topology = client
        .resolver()
        .resolve_topology(&aks)
        .await
        .context("Failed to resolve network topology")?;
    format_json(&topology)
}

/// Any supported resource by ID
pub async fn resource_info(client: &AzureClient, resource_id: &str) -> Result<String> {
    let resource = client.get_resource_by_id(resource_id).await?;
    format_json(&resource)
}

//! Azure Resource IDs
//!
//! Parses canonical ARM resource paths of the form
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{provider}/{type}/{name}[/{subtype}/{subname}]`
//! into their components. Parsing either fully succeeds or fails; an
//! identifier is never partially populated.

use super::error::ResourceIdError;
use std::fmt;
use std::str::FromStr;

/// Minimum number of `/`-separated segments (the leading empty one included)
const MIN_SEGMENTS: usize = 9;

/// Segment count of a nested resource such as a subnet
const NESTED_SEGMENTS: usize = 11;

/// A resource kind, identified by provider namespace, type and optional child type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceType {
    pub provider: &'static str,
    pub kind: &'static str,
    pub child: Option<&'static str>,
}

impl ResourceType {
    pub const fn new(provider: &'static str, kind: &'static str) -> Self {
        Self {
            provider,
            kind,
            child: None,
        }
    }

    pub const fn nested(provider: &'static str, kind: &'static str, child: &'static str) -> Self {
        Self {
            provider,
            kind,
            child: Some(child),
        }
    }

    /// Whether `id` names a resource of this kind.
    /// Provider and type names are compared ignoring ASCII case, as ARM does.
    pub fn matches(&self, id: &ResourceIdentifier) -> bool {
        let top = id.provider.eq_ignore_ascii_case(self.provider)
            && id.resource_type.eq_ignore_ascii_case(self.kind);
        match (self.child, id.sub_resource_type.as_deref()) {
            (None, None) => top,
            (Some(want), Some(have)) => top && want.eq_ignore_ascii_case(have),
            _ => false,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.kind)?;
        if let Some(child) = self.child {
            write!(f, "/{}", child)?;
        }
        Ok(())
    }
}

pub const MANAGED_CLUSTER: ResourceType =
    ResourceType::new("Microsoft.ContainerService", "managedClusters");
pub const VIRTUAL_NETWORK: ResourceType = ResourceType::new("Microsoft.Network", "virtualNetworks");
pub const SUBNET: ResourceType =
    ResourceType::nested("Microsoft.Network", "virtualNetworks", "subnets");
pub const ROUTE_TABLE: ResourceType = ResourceType::new("Microsoft.Network", "routeTables");
pub const NETWORK_SECURITY_GROUP: ResourceType =
    ResourceType::new("Microsoft.Network", "networkSecurityGroups");
pub const LOAD_BALANCER: ResourceType = ResourceType::new("Microsoft.Network", "loadBalancers");
pub const LOAD_BALANCER_FRONTEND: ResourceType =
    ResourceType::nested("Microsoft.Network", "loadBalancers", "frontendIPConfigurations");

/// A parsed Azure resource ID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentifier {
    pub subscription_id: String,
    pub resource_group: String,
    /// Provider namespace, e.g. `Microsoft.Network`
    pub provider: String,
    /// Type within the provider, e.g. `virtualNetworks`
    pub resource_type: String,
    pub resource_name: String,
    pub sub_resource_type: Option<String>,
    pub sub_resource_name: Option<String>,
    /// The trimmed input this identifier was parsed from
    pub full_id: String,
}

impl ResourceIdentifier {
    /// Parse any resource ID that follows the canonical layout
    pub fn parse(resource_id: &str) -> Result<Self, ResourceIdError> {
        let resource_id = resource_id.trim();
        if resource_id.is_empty() {
            return Err(ResourceIdError::EmptyIdentifier);
        }

        let segments: Vec<&str> = resource_id.split('/').collect();

        if segments.len() < MIN_SEGMENTS {
            return Err(ResourceIdError::malformed(
                resource_id,
                format!(
                    "expected at least {} segments, found {}",
                    MIN_SEGMENTS,
                    segments.len()
                ),
            ));
        }

        if !segments[0].is_empty() {
            return Err(ResourceIdError::malformed(resource_id, "must start with '/'"));
        }

        for (pos, token) in [(1, "subscriptions"), (3, "resourceGroups"), (5, "providers")] {
            if segments[pos] != token {
                return Err(ResourceIdError::malformed(
                    resource_id,
                    format!("expected '{}' at segment {}, found '{}'", token, pos, segments[pos]),
                ));
            }
        }

        let (sub_resource_type, sub_resource_name) = match segments.len() {
            MIN_SEGMENTS => (None, None),
            NESTED_SEGMENTS => (
                Some(segments[9].to_string()),
                Some(segments[10].to_string()),
            ),
            n => {
                return Err(ResourceIdError::malformed(
                    resource_id,
                    format!("unsupported segment count {}", n),
                ))
            }
        };

        if let Some(pos) = segments[1..].iter().position(|s| s.is_empty()) {
            return Err(ResourceIdError::malformed(
                resource_id,
                format!("empty segment at position {}", pos + 1),
            ));
        }

        Ok(Self {
            subscription_id: segments[2].to_string(),
            resource_group: segments[4].to_string(),
            provider: segments[6].to_string(),
            resource_type: segments[7].to_string(),
            resource_name: segments[8].to_string(),
            sub_resource_type,
            sub_resource_name,
            full_id: resource_id.to_string(),
        })
    }

    /// Parse and require a specific resource kind
    pub fn parse_as(resource_id: &str, expected: ResourceType) -> Result<Self, ResourceIdError> {
        let parsed = Self::parse(resource_id)?;
        if !expected.matches(&parsed) {
            return Err(ResourceIdError::UnexpectedResourceType {
                id: parsed.full_id.clone(),
                expected: expected.to_string(),
                actual: parsed.qualified_type(),
            });
        }
        Ok(parsed)
    }

    /// Parse an AKS managed cluster ID
    pub fn parse_cluster(resource_id: &str) -> Result<Self, ResourceIdError> {
        Self::parse_as(resource_id, MANAGED_CLUSTER)
    }

    /// Build a managed cluster identifier from its parts
    pub fn managed_cluster(
        subscription_id: &str,
        resource_group: &str,
        cluster_name: &str,
    ) -> Result<Self, ResourceIdError> {
        Self::from_parts(MANAGED_CLUSTER, subscription_id, resource_group, cluster_name, None)
    }

    /// Build an identifier from its parts. The canonical rendering is parsed
    /// back, so parts that are empty or contain `/` are rejected.
    /// `sub_name` is required for nested types and refused for top-level ones.
    pub fn from_parts(
        resource_type: ResourceType,
        subscription_id: &str,
        resource_group: &str,
        name: &str,
        sub_name: Option<&str>,
    ) -> Result<Self, ResourceIdError> {
        let mut rendered = format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            subscription_id, resource_group, resource_type.provider, resource_type.kind, name
        );

        match (resource_type.child, sub_name) {
            (Some(child), Some(sub_name)) => {
                rendered.push('/');
                rendered.push_str(child);
                rendered.push('/');
                rendered.push_str(sub_name);
            }
            (None, None) => {}
            (Some(child), None) => {
                return Err(ResourceIdError::malformed(
                    &rendered,
                    format!("{} requires a {} name", resource_type, child),
                ))
            }
            (None, Some(sub_name)) => {
                return Err(ResourceIdError::malformed(
                    &rendered,
                    format!("{} has no child resource named '{}'", resource_type, sub_name),
                ))
            }
        }

        let id = Self::parse_as(&rendered, resource_type)?;
        if id.full_id != rendered {
            return Err(ResourceIdError::malformed(
                &rendered,
                "parts must not carry surrounding whitespace",
            ));
        }
        Ok(id)
    }

    /// `{provider}/{type}[/{subtype}]`
    pub fn qualified_type(&self) -> String {
        match &self.sub_resource_type {
            Some(sub) => format!("{}/{}/{}", self.provider, self.resource_type, sub),
            None => format!("{}/{}", self.provider, self.resource_type),
        }
    }

    pub fn is_subnet(&self) -> bool {
        SUBNET.matches(self)
    }

    pub fn is_cluster(&self) -> bool {
        MANAGED_CLUSTER.matches(self)
    }

    /// The top-level resource of a nested ID (a subnet's virtual network).
    /// Returns `None` for IDs that are already top-level.
    pub fn parent(&self) -> Option<Self> {
        self.sub_resource_type.as_ref()?;
        let mut parent = Self {
            sub_resource_type: None,
            sub_resource_name: None,
            full_id: String::new(),
            ..self.clone()
        };
        parent.full_id = parent.canonical();
        Some(parent)
    }

    /// Whether the subscription looks like a UUID. Informational only.
    pub fn is_uuid_shaped(&self) -> bool {
        uuid::Uuid::parse_str(&self.subscription_id).is_ok()
    }

    fn canonical(&self) -> String {
        let mut out = format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            self.subscription_id,
            self.resource_group,
            self.provider,
            self.resource_type,
            self.resource_name
        );
        if let (Some(sub_type), Some(sub_name)) = (&self.sub_resource_type, &self.sub_resource_name) {
            out.push('/');
            out.push_str(sub_type);
            out.push('/');
            out.push_str(sub_name);
        }
        out
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl FromStr for ResourceIdentifier {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLUSTER_ID: &str = "/subscriptions/12345678-1234-1234-1234-123456789012/resourceGroups/rg-test/providers/Microsoft.ContainerService/managedClusters/aks-test";
    const SUBNET_ID: &str =
        "/subscriptions/S/resourceGroups/RG/providers/Microsoft.Network/virtualNetworks/V/subnets/SUB";

    #[test]
    fn test_parse_cluster_id() {
        let id = ResourceIdentifier::parse_cluster(CLUSTER_ID).unwrap();
        assert_eq!(id.subscription_id, "12345678-1234-1234-1234-123456789012");
        assert_eq!(id.resource_group, "rg-test");
        assert_eq!(id.provider, "Microsoft.ContainerService");
        assert_eq!(id.resource_type, "managedClusters");
        assert_eq!(id.resource_name, "aks-test");
        assert_eq!(id.sub_resource_name, None);
        assert_eq!(id.full_id, CLUSTER_ID);
        assert!(id.is_cluster());
        assert!(id.is_uuid_shaped());
    }

    #[test]
    fn test_parse_subnet_id() {
        let id = ResourceIdentifier::parse(SUBNET_ID).unwrap();
        assert!(id.is_subnet());
        assert_eq!(id.resource_name, "V");
        assert_eq!(id.sub_resource_type.as_deref(), Some("subnets"));
        assert_eq!(id.sub_resource_name.as_deref(), Some("SUB"));
        assert!(!id.is_uuid_shaped());

        let vnet = id.parent().unwrap();
        assert_eq!(
            vnet.full_id,
            "/subscriptions/S/resourceGroups/RG/providers/Microsoft.Network/virtualNetworks/V"
        );
        assert!(VIRTUAL_NETWORK.matches(&vnet));
        assert!(vnet.parent().is_none());
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let id = ResourceIdentifier::parse(&format!("  {}\n", CLUSTER_ID)).unwrap();
        assert_eq!(id.full_id, CLUSTER_ID);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(
            ResourceIdentifier::parse(""),
            Err(ResourceIdError::EmptyIdentifier)
        );
        assert_eq!(
            ResourceIdentifier::parse("   "),
            Err(ResourceIdError::EmptyIdentifier)
        );
    }

    #[test]
    fn test_too_few_segments() {
        assert!(matches!(
            ResourceIdentifier::parse("/subscriptions/x"),
            Err(ResourceIdError::MalformedIdentifier { .. })
        ));
    }

    #[test]
    fn test_literal_tokens_are_case_sensitive() {
        let lowered = CLUSTER_ID.replace("resourceGroups", "resourcegroups");
        let err = ResourceIdentifier::parse(&lowered).unwrap_err();
        match err {
            ResourceIdError::MalformedIdentifier { id, reason } => {
                assert_eq!(id, lowered);
                assert!(reason.contains("resourceGroups"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_ambiguous_shapes_are_rejected() {
        // trailing slash, missing leading slash, dangling sub-type, empty name
        for bad in [
            format!("{}/", CLUSTER_ID),
            CLUSTER_ID.trim_start_matches('/').to_string(),
            format!("{}/agentPools", CLUSTER_ID),
            "/subscriptions/S/resourceGroups//providers/Microsoft.Network/virtualNetworks/V".to_string(),
        ] {
            assert!(
                matches!(
                    ResourceIdentifier::parse(&bad),
                    Err(ResourceIdError::MalformedIdentifier { .. })
                ),
                "should reject {}",
                bad
            );
        }
    }

    #[test]
    fn test_parse_cluster_rejects_other_types() {
        let err = ResourceIdentifier::parse_cluster(SUBNET_ID).unwrap_err();
        match err {
            ResourceIdError::UnexpectedResourceType { expected, actual, .. } => {
                assert_eq!(expected, "Microsoft.ContainerService/managedClusters");
                assert_eq!(actual, "Microsoft.Network/virtualNetworks/subnets");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_type_match_ignores_case() {
        let id = ResourceIdentifier::parse(
            "/subscriptions/S/resourceGroups/RG/providers/microsoft.network/networksecuritygroups/nsg",
        )
        .unwrap();
        assert!(NETWORK_SECURITY_GROUP.matches(&id));
        assert!(!ROUTE_TABLE.matches(&id));
    }

    #[test]
    fn test_managed_cluster_constructor() {
        let id = ResourceIdentifier::managed_cluster("sub", "rg", "aks").unwrap();
        assert_eq!(
            id.to_string(),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.ContainerService/managedClusters/aks"
        );
        assert_eq!(ResourceIdentifier::parse(&id.full_id).unwrap(), id);
    }

    #[test]
    fn test_from_str() {
        let id: ResourceIdentifier = SUBNET_ID.parse().unwrap();
        assert_eq!(id.subscription_id, "S");
    }

    #[test]
    fn test_constructor_rejects_unparseable_parts() {
        for (sub, rg, name) in [
            ("sub", "", "aks"),
            ("sub", "rg", "a/b"),
            ("", "rg", "aks"),
            ("sub", "rg", "aks "),
        ] {
            assert!(
                matches!(
                    ResourceIdentifier::managed_cluster(sub, rg, name),
                    Err(ResourceIdError::MalformedIdentifier { .. })
                ),
                "should reject ({:?}, {:?}, {:?})",
                sub,
                rg,
                name
            );
        }
    }

    #[test]
    fn test_from_parts_checks_child_name() {
        let subnet = ResourceIdentifier::from_parts(SUBNET, "S", "RG", "V", Some("SUB")).unwrap();
        assert_eq!(subnet.full_id, SUBNET_ID);
        assert_eq!(ResourceIdentifier::parse(SUBNET_ID).unwrap(), subnet);

        assert!(ResourceIdentifier::from_parts(SUBNET, "S", "RG", "V", None).is_err());
        let err =
            ResourceIdentifier::from_parts(ROUTE_TABLE, "S", "RG", "rt", Some("routes")).unwrap_err();
        match err {
            ResourceIdError::MalformedIdentifier { reason, .. } => {
                assert!(reason.contains("no child resource"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

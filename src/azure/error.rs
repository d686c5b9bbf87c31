//! Error types for Azure operations
//!
//! Parsing, client construction, remote calls and dependency resolution each
//! get their own enum so callers can tell a bad input apart from a transient
//! remote failure.

use std::time::Duration;
use thiserror::Error;

/// Failures while parsing an Azure resource ID
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceIdError {
    /// The input was empty (or only whitespace)
    #[error("resource ID cannot be empty")]
    EmptyIdentifier,

    /// The input does not follow the canonical segment layout
    #[error("invalid resource ID format: {id} ({reason})")]
    MalformedIdentifier { id: String, reason: String },

    /// The input parsed but names a different resource kind than required
    #[error("resource ID {id} is not a {expected} (found {actual})")]
    UnexpectedResourceType {
        id: String,
        expected: String,
        actual: String,
    },
}

impl ResourceIdError {
    pub(crate) fn malformed(id: &str, reason: impl Into<String>) -> Self {
        Self::MalformedIdentifier {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failures while building the client bundle for a subscription
#[derive(Debug, Clone, Error)]
pub enum ConstructionError {
    #[error("subscription ID cannot be empty")]
    EmptySubscription,

    #[error("invalid subscription ID {subscription_id:?}: {reason}")]
    InvalidSubscription {
        subscription_id: String,
        reason: String,
    },

    #[error("failed to create {client} client for subscription {subscription_id}: invalid endpoint: {reason}")]
    InvalidEndpoint {
        client: &'static str,
        subscription_id: String,
        reason: String,
    },

    #[error("failed to create clients for subscription {subscription_id}: {reason}")]
    Credential {
        subscription_id: String,
        reason: String,
    },
}

/// Failures of a single call against Azure Resource Manager
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API request failed: {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("failed to send request to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to parse response JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to get access token: {0}")]
    Credential(String),

    #[error("refusing to follow nextLink {link}: {reason}")]
    Paging { link: String, reason: String },
}

impl ApiError {
    /// True when ARM answered 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == reqwest::StatusCode::NOT_FOUND)
    }
}

/// Which remote hop of a resolution failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hop {
    SubnetFetch,
    DependencyFetch,
}

impl std::fmt::Display for Hop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Hop::SubnetFetch => write!(f, "subnet fetch"),
            Hop::DependencyFetch => write!(f, "dependency fetch"),
        }
    }
}

/// Failures while resolving a cluster's network dependencies
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("invalid cluster: {0}")]
    InvalidCluster(String),

    #[error(transparent)]
    MalformedIdentifier(#[from] ResourceIdError),

    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error("failed to get subnet details for {subnet_id}: {source}")]
    SubnetFetch {
        subnet_id: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to get dependency details for {resource_id}: {source}")]
    DependencyFetch {
        resource_id: String,
        #[source]
        source: ApiError,
    },

    #[error("{hop} for {subject} timed out after {timeout:?}")]
    Timeout {
        hop: Hop,
        subject: String,
        timeout: Duration,
    },
}

impl ResolutionError {
    /// The hop that failed, if this error came from a remote call
    pub fn hop(&self) -> Option<Hop> {
        match self {
            Self::SubnetFetch { .. } => Some(Hop::SubnetFetch),
            Self::DependencyFetch { .. } => Some(Hop::DependencyFetch),
            Self::Timeout { hop, .. } => Some(*hop),
            _ => None,
        }
    }
}

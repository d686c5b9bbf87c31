//! HTTP utilities for Azure Resource Manager REST calls

use super::error::ApiError;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Public ARM endpoint
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com/";

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncate and strip control characters from a response body before logging
fn sanitize_for_log(body: &str) -> String {
    let total = body.chars().count();
    let truncated = if total > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for ARM calls
#[derive(Clone)]
pub struct ArmHttpClient {
    client: Client,
    endpoint: Url,
}

impl ArmHttpClient {
    /// Create a client for the given ARM endpoint
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let mut endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid ARM endpoint: {}", endpoint))?;
        // Relative joins below the endpoint need a trailing slash
        if !endpoint.cannot_be_a_base() && !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(concat!("aks-gateway/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// GET a JSON document from ARM
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, token: &str) -> Result<T, ApiError> {
        let request_id = uuid::Uuid::new_v4();
        tracing::debug!("GET {} (request id {})", url, request_id);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header("x-ms-client-request-id", request_id.to_string())
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(ApiError::Status {
                status,
                url: url.to_string(),
            });
        }

        serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// Format an ARM error for display
pub fn format_arm_error(error: &ApiError) -> String {
    match error {
        ApiError::Status { status, .. } => match status.as_u16() {
            401 => "Authentication failed. Refresh your Azure access token.".to_string(),
            403 => "Permission denied. Check your Azure RBAC role assignments.".to_string(),
            404 => "Resource not found.".to_string(),
            409 => "Resource conflict. The resource may be in use or being updated.".to_string(),
            429 => "Rate limit exceeded. Please try again later.".to_string(),
            400 => "Invalid request. Check your parameters.".to_string(),
            500..=599 => "Azure service temporarily unavailable. Please try again.".to_string(),
            _ => format!("Request failed with status {}.", status),
        },
        ApiError::Transport { .. } => {
            "Request failed. Check your network connection and try again.".to_string()
        }
        ApiError::Decode { .. } => "Unexpected response from Azure.".to_string(),
        ApiError::Credential(_) => "Could not obtain an Azure access token.".to_string(),
        ApiError::Paging { .. } => "Azure returned an invalid continuation link.".to_string(),
    }
}

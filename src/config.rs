//! Configuration Management
//!
//! Handles persistent configuration storage for aks-gateway.

use crate::azure::cache::{DEFAULT_CACHE_TTL, DEFAULT_MAX_ENTRIES};
use crate::azure::http::DEFAULT_ARM_ENDPOINT;
use crate::azure::topology::DEFAULT_HOP_TIMEOUT;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// ARM endpoint (sovereign clouds use their own)
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Response cache TTL in seconds; 0 disables caching
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
    /// Upper bound on cached entries
    #[serde(default)]
    pub cache_max_entries: Option<usize>,
    /// Last cluster resource ID used
    #[serde(default)]
    pub last_cluster: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("aks-gateway").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Get effective endpoint (config > public cloud)
    pub fn effective_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ARM_ENDPOINT.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_HOP_TIMEOUT)
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CACHE_TTL)
    }

    pub fn cache_max_entries(&self) -> usize {
        self.cache_max_entries.unwrap_or(DEFAULT_MAX_ENTRIES)
    }

    /// Remember the cluster and save
    pub fn set_last_cluster(&mut self, cluster_id: &str) -> Result<()> {
        self.last_cluster = Some(cluster_id.to_string());
        self.save()
    }
}

//! Azure Authentication
//!
//! The gateway does not acquire credentials itself. It is handed a
//! [`TokenProvider`] and caches the tokens it yields for ARM calls.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Scope for Azure Resource Manager access
pub const ARM_SCOPE: &str = "https://management.azure.com/.default";

/// Environment variable holding a pre-acquired ARM bearer token
pub const ACCESS_TOKEN_ENV: &str = "AZURE_ACCESS_TOKEN";

/// Token expiry buffer - refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if the provider doesn't report one
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// An access token and how long it stays valid
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: Option<Duration>,
}

/// Source of bearer tokens
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self, scope: &str) -> anyhow::Result<AccessToken>;

    /// Reject a provider that can never yield a token, without a round trip
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Serves one fixed token
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Read the token from `AZURE_ACCESS_TOKEN`
    pub fn from_env() -> Option<Self> {
        std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(Self::new)
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self, _scope: &str) -> anyhow::Result<AccessToken> {
        if self.token.trim().is_empty() {
            anyhow::bail!("static access token is empty");
        }
        Ok(AccessToken {
            token: self.token.clone(),
            expires_in: None,
        })
    }

    fn validate(&self) -> Result<(), String> {
        if self.token.trim().is_empty() {
            return Err("static access token is empty".to_string());
        }
        Ok(())
    }
}

/// Shared credential with token caching
#[derive(Clone)]
pub struct AzureCredentials {
    provider: Arc<dyn TokenProvider>,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl AzureCredentials {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Credentials serving a fixed token
    pub fn from_static(token: impl Into<String>) -> Self {
        Self::new(Arc::new(StaticTokenProvider::new(token)))
    }

    pub fn validate(&self) -> Result<(), String> {
        self.provider.validate()
    }

    /// Get an access token for ARM calls
    pub async fn get_token(&self) -> anyhow::Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let token = self.provider.token(ARM_SCOPE).await?;

        let ttl = token.expires_in.unwrap_or(DEFAULT_TOKEN_TTL);
        let expires_at = Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER);

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token.token.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            ttl.saturating_sub(TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token.token)
    }

    /// Force refresh the token
    pub async fn refresh_token(&self) -> anyhow::Result<String> {
        {
            let mut cache = self.token_cache.write().await;
            *cache = None;
        }
        self.get_token().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
        expires_in: Option<Duration>,
    }

    #[async_trait]
    impl TokenProvider for CountingProvider {
        async fn token(&self, scope: &str) -> anyhow::Result<AccessToken> {
            assert_eq!(scope, ARM_SCOPE);
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AccessToken {
                token: format!("token-{}", n),
                expires_in: self.expires_in,
            })
        }
    }

    #[tokio::test]
    async fn test_token_is_cached() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            expires_in: None,
        });
        let creds = AzureCredentials::new(provider.clone());

        assert_eq!(creds.get_token().await.unwrap(), "token-0");
        assert_eq!(creds.get_token().await.unwrap(), "token-0");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        assert_eq!(creds.refresh_token().await.unwrap(), "token-1");
    }

    #[tokio::test]
    async fn test_short_lived_token_is_refetched() {
        // TTL below the expiry buffer is already stale when cached
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            expires_in: Some(Duration::from_secs(30)),
        });
        let creds = AzureCredentials::new(provider.clone());

        creds.get_token().await.unwrap();
        creds.get_token().await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_static_token_fails() {
        let creds = AzureCredentials::from_static("  ");
        assert!(creds.validate().is_err());
        assert!(creds.get_token().await.is_err());
    }

    #[test]
    fn test_validate_defaults_to_ok() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
            expires_in: None,
        };
        assert!(provider.validate().is_ok());
        assert!(AzureCredentials::from_static("t").validate().is_ok());
    }
}

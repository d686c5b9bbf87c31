//! Subscription client pool
//!
//! Hands out one [`SubscriptionClients`] bundle per subscription, building it
//! lazily on first use. Bundles are inserted only once fully constructed, so
//! concurrent callers either see a complete bundle or build it themselves
//! under the write lock; at most one bundle is ever built per subscription.

use super::arm::SubscriptionClients;
use super::auth::AzureCredentials;
use super::error::ConstructionError;
use super::http::ArmHttpClient;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Builds the client bundle for a subscription
pub trait ClientFactory: Send + Sync {
    fn create(
        &self,
        subscription_id: &str,
        credentials: &AzureCredentials,
    ) -> Result<SubscriptionClients, ConstructionError>;
}

/// Builds ARM REST clients sharing one HTTP transport
pub struct ArmClientFactory {
    http: ArmHttpClient,
}

impl ArmClientFactory {
    pub fn new(http: ArmHttpClient) -> Self {
        Self { http }
    }
}

impl ClientFactory for ArmClientFactory {
    fn create(
        &self,
        subscription_id: &str,
        credentials: &AzureCredentials,
    ) -> Result<SubscriptionClients, ConstructionError> {
        SubscriptionClients::new(subscription_id, credentials, &self.http)
    }
}

/// Per-subscription client cache
pub struct SubscriptionClientPool {
    clients: RwLock<HashMap<String, Arc<SubscriptionClients>>>,
    credentials: AzureCredentials,
    factory: Arc<dyn ClientFactory>,
}

impl SubscriptionClientPool {
    /// Pool building ARM clients over `http`
    pub fn new(credentials: AzureCredentials, http: ArmHttpClient) -> Self {
        Self::with_factory(credentials, Arc::new(ArmClientFactory::new(http)))
    }

    pub fn with_factory(credentials: AzureCredentials, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            credentials,
            factory,
        }
    }

    pub fn credentials(&self) -> &AzureCredentials {
        &self.credentials
    }

    /// Get the clients for a subscription, building them on first use.
    /// A failed build leaves nothing behind; the next call tries again.
    pub async fn get_or_create(
        &self,
        subscription_id: &str,
    ) -> Result<Arc<SubscriptionClients>, ConstructionError> {
        {
            let clients = self.clients.read().await;
            if let Some(existing) = clients.get(subscription_id) {
                return Ok(existing.clone());
            }
        }

        let mut clients = self.clients.write().await;

        // Another task may have built it while we waited for the write lock
        if let Some(existing) = clients.get(subscription_id) {
            return Ok(existing.clone());
        }

        let bundle = Arc::new(self.factory.create(subscription_id, &self.credentials)?);
        clients.insert(subscription_id.to_string(), bundle.clone());

        tracing::info!("Created Azure clients for subscription {}", subscription_id);
        Ok(bundle)
    }

    pub async fn contains(&self, subscription_id: &str) -> bool {
        self.clients.read().await.contains_key(subscription_id)
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts builds and can fail the first `fail_first` attempts
    struct CountingFactory {
        inner: ArmClientFactory,
        builds: AtomicUsize,
        attempts: AtomicUsize,
        fail_first: usize,
        delay: Duration,
    }

    impl CountingFactory {
        fn new(fail_first: usize, delay: Duration) -> Self {
            let http = ArmHttpClient::new("https://management.azure.com/", Duration::from_secs(5))
                .unwrap();
            Self {
                inner: ArmClientFactory::new(http),
                builds: AtomicUsize::new(0),
                attempts: AtomicUsize::new(0),
                fail_first,
                delay,
            }
        }
    }

    impl ClientFactory for CountingFactory {
        fn create(
            &self,
            subscription_id: &str,
            credentials: &AzureCredentials,
        ) -> Result<SubscriptionClients, ConstructionError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            // widen the race window
            std::thread::sleep(self.delay);
            if attempt < self.fail_first {
                return Err(ConstructionError::Credential {
                    subscription_id: subscription_id.to_string(),
                    reason: "injected failure".to_string(),
                });
            }
            let bundle = self.inner.create(subscription_id, credentials)?;
            self.builds.fetch_add(1, Ordering::SeqCst);
            Ok(bundle)
        }
    }

    fn pool_with(factory: Arc<CountingFactory>) -> SubscriptionClientPool {
        SubscriptionClientPool::with_factory(AzureCredentials::from_static("token"), factory)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_bundle() {
        let factory = Arc::new(CountingFactory::new(0, Duration::from_millis(20)));
        let pool = Arc::new(pool_with(factory.clone()));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move { pool.get_or_create("sub-a").await })
            })
            .collect();

        let bundles: Vec<Arc<SubscriptionClients>> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);
        assert!(bundles.iter().all(|b| Arc::ptr_eq(b, &bundles[0])));
        assert_eq!(bundles[0].subscription_id, "sub-a");
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_subscriptions_get_distinct_bundles() {
        let factory = Arc::new(CountingFactory::new(0, Duration::ZERO));
        let pool = pool_with(factory.clone());

        let a = pool.get_or_create("sub-a").await.unwrap();
        let b = pool.get_or_create("sub-b").await.unwrap();
        let a_again = pool.get_or_create("sub-a").await.unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &a_again));
        assert_eq!(factory.builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_construction_is_not_cached() {
        let factory = Arc::new(CountingFactory::new(1, Duration::ZERO));
        let pool = pool_with(factory.clone());

        let err = pool.get_or_create("sub-a").await.unwrap_err();
        assert!(err.to_string().contains("sub-a"));
        assert!(!pool.contains("sub-a").await);
        assert!(pool.is_empty().await);

        let bundle = pool.get_or_create("sub-a").await.unwrap();
        assert_eq!(bundle.subscription_id, "sub-a");
        assert_eq!(factory.attempts.load(Ordering::SeqCst), 2);
        assert!(pool.contains("sub-a").await);
    }

    #[tokio::test]
    async fn test_invalid_subscription_surfaces_construction_error() {
        let factory = Arc::new(CountingFactory::new(0, Duration::ZERO));
        let pool = pool_with(factory);

        assert!(matches!(
            pool.get_or_create("").await,
            Err(ConstructionError::EmptySubscription)
        ));
        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_token_leaves_pool_empty() {
        let http =
            ArmHttpClient::new("https://management.azure.com/", Duration::from_secs(5)).unwrap();
        let pool = SubscriptionClientPool::new(AzureCredentials::from_static(""), http);

        let err = pool.get_or_create("sub-a").await.unwrap_err();
        assert!(matches!(err, ConstructionError::Credential { .. }));
        assert!(pool.is_empty().await);
    }
}

use std::sync::Arc;
use log::info;
use crate::error::Result;
use crate::models::{ChatId, Subscription};
use crate::storage::SubscriptionStore;
use crate::validation::validate_interval;

pub struct SubscriptionService {
    store: Arc<dyn SubscriptionStore>,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    /// Re-enabling replaces the interval and clears `last_sent_at`, so the
    /// chat becomes due immediately.
    pub async fn enable(&self, chat_id: ChatId, interval_minutes: i64) -> Result<()> {
        let interval = validate_interval(interval_minutes)?;
        self.store.enable(chat_id, interval).await?;
        info!("Subscription enabled for chat {} every {} min", chat_id, interval);
        Ok(())
    }

    pub async fn disable(&self, chat_id: ChatId) -> Result<()> {
        self.store.disable(chat_id).await?;
        info!("Subscription disabled for chat {}", chat_id);
        Ok(())
    }

    pub async fn status(&self, chat_id: ChatId) -> Result<Option<Subscription>> {
        self.store.get(chat_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::storage::{MemoryStore, MockSubscriptionStore};
    use crate::tests::common::t0;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_invalid_interval_is_rejected_before_store() {
        let mut store = MockSubscriptionStore::new();
        store.expect_enable().never();

        let service = SubscriptionService::new(Arc::new(store));
        assert!(matches!(service.enable(1, 0).await, Err(Error::InvalidInterval(0))));
        assert!(matches!(service.enable(1, -3).await, Err(Error::InvalidInterval(-3))));
    }

    #[tokio::test]
    async fn test_enable_passes_interval_through() {
        let mut store = MockSubscriptionStore::new();
        store
            .expect_enable()
            .with(eq(5), eq(15))
            .times(1)
            .returning(|_, _| Ok(()));

        let service = SubscriptionService::new(Arc::new(store));
        service.enable(5, 15).await.unwrap();
    }

    #[tokio::test]
    async fn test_enable_then_due_and_disable_twice() {
        let store = Arc::new(MemoryStore::new());
        let service = SubscriptionService::new(store.clone());

        service.enable(9, 60).await.unwrap();
        assert_eq!(store.find_due(t0()).await.unwrap(), vec![9]);

        service.disable(9).await.unwrap();
        let once = service.status(9).await.unwrap();
        service.disable(9).await.unwrap();
        let twice = service.status(9).await.unwrap();
        assert_eq!(once, twice);
        assert!(!twice.unwrap().enabled);
        assert!(store.find_due(t0()).await.unwrap().is_empty());
    }
}

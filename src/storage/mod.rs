use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::error::Result;
use crate::models::{ChatId, PricePoint, Subscription};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Time-ordered price series per symbol.
///
/// Writes are idempotent on `(symbol, timestamp)`: saving a point for an
/// existing key replaces its value.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceHistoryStore: Send + Sync {
    async fn save_batch(&self, points: &[PricePoint]) -> Result<()>;

    async fn latest_for(&self, symbol: &str) -> Result<Option<PricePoint>>;

    /// Latest point of every symbol that has one, ordered by symbol.
    async fn latest_all(&self) -> Result<Vec<PricePoint>>;

    /// Points in `[from, to]`, ascending by timestamp.
    async fn range_for(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>>;
}

/// Per-chat digest subscriptions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Creates or re-enables a subscription and clears `last_sent_at`.
    async fn enable(&self, chat_id: ChatId, interval_minutes: i32) -> Result<()>;

    /// No-op when the chat has no subscription or it is already disabled.
    async fn disable(&self, chat_id: ChatId) -> Result<()>;

    /// Enabled chats never sent to, or whose interval has fully elapsed at
    /// `now` (inclusive). Ordered by chat id.
    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<ChatId>>;

    async fn mark_sent(&self, chat_id: ChatId, at: DateTime<Utc>) -> Result<()>;

    async fn get(&self, chat_id: ChatId) -> Result<Option<Subscription>>;
}

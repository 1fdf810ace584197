use std::time::Duration;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use sqlx::postgres::{PgPool, PgPoolOptions};
use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{ChatId, Coin, PricePoint, Subscription};
use super::{PriceHistoryStore, SubscriptionStore};

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;
        info!("Connected to Postgres (max_connections={})", config.max_connections);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Registers the tracked coins so price rows can reference them.
    pub async fn seed_coins(&self, coins: &[Coin]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for coin in coins {
            sqlx::query(
                "INSERT INTO coins (symbol, provider_id) VALUES ($1, $2) \
                 ON CONFLICT (symbol) DO UPDATE SET provider_id = EXCLUDED.provider_id",
            )
            .bind(&coin.symbol)
            .bind(&coin.provider_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        debug!("Seeded {} coins", coins.len());
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn to_point(row: (String, f64, DateTime<Utc>)) -> PricePoint {
    let (symbol, value, timestamp) = row;
    PricePoint::new(&symbol, value, timestamp)
}

#[async_trait]
impl PriceHistoryStore for PostgresStore {
    async fn save_batch(&self, points: &[PricePoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for point in points {
            sqlx::query(
                "INSERT INTO prices (coin_symbol, value, timestamp) VALUES ($1, $2, $3) \
                 ON CONFLICT (coin_symbol, timestamp) DO UPDATE SET value = EXCLUDED.value",
            )
            .bind(&point.symbol)
            .bind(point.value)
            .bind(point.timestamp)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn latest_for(&self, symbol: &str) -> Result<Option<PricePoint>> {
        let row = sqlx::query_as::<_, (String, f64, DateTime<Utc>)>(
            "SELECT coin_symbol, value, timestamp FROM prices \
             WHERE coin_symbol = $1 ORDER BY timestamp DESC LIMIT 1",
        )
        .bind(symbol.to_uppercase())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(to_point))
    }

    async fn latest_all(&self) -> Result<Vec<PricePoint>> {
        let rows = sqlx::query_as::<_, (String, f64, DateTime<Utc>)>(
            "SELECT DISTINCT ON (coin_symbol) coin_symbol, value, timestamp FROM prices \
             ORDER BY coin_symbol, timestamp DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(to_point).collect())
    }

    async fn range_for(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>> {
        let rows = sqlx::query_as::<_, (String, f64, DateTime<Utc>)>(
            "SELECT coin_symbol, value, timestamp FROM prices \
             WHERE coin_symbol = $1 AND timestamp BETWEEN $2 AND $3 \
             ORDER BY timestamp ASC",
        )
        .bind(symbol.to_uppercase())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(to_point).collect())
    }
}

#[async_trait]
impl SubscriptionStore for PostgresStore {
    async fn enable(&self, chat_id: ChatId, interval_minutes: i32) -> Result<()> {
        sqlx::query(
            "INSERT INTO subscriptions (chat_id, enabled, interval_minutes, last_sent_at) \
             VALUES ($1, TRUE, $2, NULL) \
             ON CONFLICT (chat_id) DO UPDATE SET enabled = TRUE, \
             interval_minutes = EXCLUDED.interval_minutes, last_sent_at = NULL",
        )
        .bind(chat_id)
        .bind(interval_minutes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn disable(&self, chat_id: ChatId) -> Result<()> {
        sqlx::query("UPDATE subscriptions SET enabled = FALSE WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<ChatId>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT chat_id FROM subscriptions \
             WHERE enabled = TRUE AND (last_sent_at IS NULL \
             OR EXTRACT(EPOCH FROM ($1::timestamptz - last_sent_at)) / 60 >= interval_minutes) \
             ORDER BY chat_id",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn mark_sent(&self, chat_id: ChatId, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE subscriptions SET last_sent_at = $2 WHERE chat_id = $1")
            .bind(chat_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, chat_id: ChatId) -> Result<Option<Subscription>> {
        let row = sqlx::query_as::<_, (i64, bool, i32, Option<DateTime<Utc>>)>(
            "SELECT chat_id, enabled, interval_minutes, last_sent_at FROM subscriptions \
             WHERE chat_id = $1",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(chat_id, enabled, interval_minutes, last_sent_at)| Subscription {
            chat_id,
            enabled,
            interval_minutes,
            last_sent_at,
        }))
    }
}

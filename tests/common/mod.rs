#![allow(dead_code)]

use std::collections::HashSet;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Mutex;
use crypto_rates_bot::error::{Error, Result};
use crypto_rates_bot::models::{ChatId, Coin, PricePoint, TrackedAssets};
use crypto_rates_bot::notifier::Notifier;
use crypto_rates_bot::api::PriceSource;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap()
}

pub fn tracked() -> TrackedAssets {
    TrackedAssets::new(vec![
        Coin::new("BTC", "bitcoin"),
        Coin::new("ETH", "ethereum"),
    ])
}

/// Records every delivered message; chats in `failing` are rejected.
#[derive(Default)]
pub struct RecordingNotifier {
    pub delivered: Mutex<Vec<(ChatId, String)>>,
    failing: HashSet<ChatId>,
}

impl RecordingNotifier {
    pub fn failing_for(chats: &[ChatId]) -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            failing: chats.iter().copied().collect(),
        }
    }

    pub async fn recipients(&self) -> Vec<ChatId> {
        self.delivered.lock().await.iter().map(|(chat, _)| *chat).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<()> {
        if self.failing.contains(&chat_id) {
            return Err(Error::NotifyError(format!("bot was blocked by chat {}", chat_id)));
        }
        self.delivered.lock().await.push((chat_id, text.to_string()));
        Ok(())
    }
}

/// Returns a fixed batch of quotes on every fetch.
pub struct StaticSource {
    pub quotes: Vec<PricePoint>,
}

#[async_trait]
impl PriceSource for StaticSource {
    async fn fetch_current(&self) -> Result<Vec<PricePoint>> {
        Ok(self.quotes.clone())
    }
}

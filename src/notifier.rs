use async_trait::async_trait;
use log::info;
use crate::error::Result;
use crate::models::ChatId;

/// Outbound message channel to a subscriber.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<()>;
}

/// Writes digests to the log instead of delivering them. Used when the
/// Telegram bot is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<()> {
        info!("Digest for chat {}:\n{}", chat_id, text);
        Ok(())
    }
}

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::time::timeout;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::metrics::{DELIVERY_FAILURES, DIGESTS_SENT, MARK_SENT_FAILURES};
use crate::notifier::Notifier;
use crate::scheduler::Job;
use crate::services::rates::RateAnalytics;
use crate::storage::SubscriptionStore;
use crate::telegram::format::render_digest;

/// One notification cycle over the due subscriptions.
pub struct DispatchEngine {
    subscriptions: Arc<dyn SubscriptionStore>,
    analytics: Arc<RateAnalytics>,
    notifier: Arc<dyn Notifier>,
    snapshot_timeout: Duration,
}

impl DispatchEngine {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        analytics: Arc<RateAnalytics>,
        notifier: Arc<dyn Notifier>,
        snapshot_timeout: Duration,
    ) -> Self {
        Self { subscriptions, analytics, notifier, snapshot_timeout }
    }

    /// Returns how many chats were both delivered to and marked as sent.
    ///
    /// Failing to load the due list or the snapshot fails the cycle.
    /// Per-recipient failures are logged and skipped.
    pub async fn dispatch_due(&self, now: DateTime<Utc>) -> Result<usize> {
        let due = self.subscriptions.find_due(now).await?;
        if due.is_empty() {
            debug!("No subscriptions due at {}", now);
            return Ok(0);
        }

        let snapshot = match timeout(self.snapshot_timeout, self.analytics.get_all_latest()).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(Error::NoPricesAvailable(_))) => {
                warn!("Empty rate snapshot, skipping {} due chats", due.len());
                return Ok(0);
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(Error::Timeout(format!(
                    "rate snapshot not ready within {:?}",
                    self.snapshot_timeout
                )))
            }
        };
        let digest = render_digest(&snapshot);

        let mut sent = 0;
        for chat_id in due {
            if let Err(e) = self.notifier.send(chat_id, &digest).await {
                error!("Failed to deliver digest to chat {}: {}", chat_id, e);
                DELIVERY_FAILURES.inc();
                continue;
            }
            match self.subscriptions.mark_sent(chat_id, now).await {
                Ok(()) => {
                    sent += 1;
                    DIGESTS_SENT.inc();
                }
                Err(e) => {
                    error!("Digest delivered to chat {} but mark_sent failed: {}", chat_id, e);
                    MARK_SENT_FAILURES.inc();
                }
            }
        }

        Ok(sent)
    }
}

/// Runs `dispatch_due` at the clock's current instant.
pub struct DispatchJob {
    engine: Arc<DispatchEngine>,
    clock: Arc<dyn Clock>,
}

impl DispatchJob {
    pub fn new(engine: Arc<DispatchEngine>, clock: Arc<dyn Clock>) -> Self {
        Self { engine, clock }
    }
}

#[async_trait]
impl Job for DispatchJob {
    fn name(&self) -> &'static str {
        "dispatch"
    }

    async fn run(&self) -> Result<()> {
        let sent = self.engine.dispatch_due(self.clock.now()).await?;
        if sent > 0 {
            info!("Dispatch cycle sent {} digests", sent);
        }
        Ok(())
    }
}

use std::collections::HashMap;
use std::slice;
use std::sync::Arc;
use async_trait::async_trait;
use log::{error, info, warn};
use crate::api::PriceSource;
use crate::error::Result;
use crate::metrics::POINTS_SAVED;
use crate::models::{PricePoint, TrackedAssets};
use crate::scheduler::Job;
use crate::storage::PriceHistoryStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub fetched: usize,
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Fetch-and-persist cycle for the tracked assets.
pub struct IngestService {
    source: Arc<dyn PriceSource>,
    store: Arc<dyn PriceHistoryStore>,
    tracked: TrackedAssets,
}

impl IngestService {
    pub fn new(
        source: Arc<dyn PriceSource>,
        store: Arc<dyn PriceHistoryStore>,
        tracked: TrackedAssets,
    ) -> Self {
        Self { source, store, tracked }
    }

    /// Only a failed fetch fails the cycle. Each tracked symbol is saved on
    /// its own so one bad write does not discard the others.
    pub async fn run_cycle(&self) -> Result<IngestReport> {
        let quotes = self.source.fetch_current().await?;
        let mut report = IngestReport { fetched: quotes.len(), ..IngestReport::default() };

        let by_symbol: HashMap<String, PricePoint> = quotes
            .into_iter()
            .map(|p| (p.symbol.to_uppercase(), p))
            .collect();

        for coin in self.tracked.coins() {
            let point = match by_symbol.get(&coin.symbol) {
                Some(point) => point,
                None => {
                    warn!("Missing rate for {}", coin.symbol);
                    report.skipped += 1;
                    continue;
                }
            };
            if point.value.is_nan() || point.value <= 0.0 {
                warn!("Skipping non-positive rate for {}: {}", coin.symbol, point.value);
                report.skipped += 1;
                continue;
            }

            match self.store.save_batch(slice::from_ref(point)).await {
                Ok(()) => {
                    report.saved += 1;
                    POINTS_SAVED.inc();
                }
                Err(e) => {
                    error!("Failed to save rate for {}: {}", coin.symbol, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

#[async_trait]
impl Job for IngestService {
    fn name(&self) -> &'static str {
        "ingestion"
    }

    async fn run(&self) -> Result<()> {
        let report = self.run_cycle().await?;
        info!(
            "Ingestion cycle: fetched={} saved={} skipped={} failed={}",
            report.fetched, report.saved, report.skipped, report.failed
        );
        Ok(())
    }
}

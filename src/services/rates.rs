use std::sync::Arc;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::models::{PricePoint, RateStats, TrackedAssets};
use crate::storage::PriceHistoryStore;

const DEFAULT_WINDOW_HOURS: i64 = 24;
const CHANGE_LOOKBACK_HOURS: i64 = 1;

/// Min/max over a window plus the reference point for the 1h change.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSummary {
    pub min: f64,
    pub max: f64,
    pub reference: Option<PricePoint>,
}

/// Single pass over an ascending window. The reference is the last point at
/// or before `threshold`; among equal timestamps the later one in `window`
/// wins. Returns `None` for an empty window.
pub fn summarize_window(window: &[PricePoint], threshold: DateTime<Utc>) -> Option<WindowSummary> {
    let first = window.first()?;
    let mut summary = WindowSummary {
        min: first.value,
        max: first.value,
        reference: None,
    };
    for point in window {
        summary.min = summary.min.min(point.value);
        summary.max = summary.max.max(point.value);
        if point.timestamp <= threshold {
            summary.reference = Some(point.clone());
        }
    }
    Some(summary)
}

/// Percent change from `reference` to `current`. A missing or zero
/// reference is reported as `InsufficientHistoryForChange`.
pub fn percent_change(symbol: &str, current: f64, reference: Option<&PricePoint>) -> Result<f64> {
    match reference {
        Some(point) if point.value != 0.0 => Ok((current - point.value) / point.value * 100.0),
        _ => Err(Error::InsufficientHistoryForChange(symbol.to_string())),
    }
}

fn hours_before(at: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>> {
    at.checked_sub_signed(Duration::hours(hours))
        .ok_or_else(|| Error::ValidationError(format!("window end {} is out of range", at)))
}

pub struct RateAnalytics {
    tracked: TrackedAssets,
    store: Arc<dyn PriceHistoryStore>,
    clock: Arc<dyn Clock>,
}

impl RateAnalytics {
    pub fn new(
        tracked: TrackedAssets,
        store: Arc<dyn PriceHistoryStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { tracked, store, clock }
    }

    pub fn tracked(&self) -> &TrackedAssets {
        &self.tracked
    }

    /// Latest price of every tracked symbol that has one, ordered by symbol.
    pub async fn get_all_latest(&self) -> Result<Vec<RateStats>> {
        let mut latest: Vec<RateStats> = self
            .store
            .latest_all()
            .await?
            .into_iter()
            .filter(|p| self.tracked.is_tracked(&p.symbol))
            .map(RateStats::from)
            .collect();

        if latest.is_empty() {
            return Err(Error::NoPricesAvailable("no prices for any tracked coin".to_string()));
        }
        latest.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(latest)
    }

    /// Window defaults: `to` is now, `from` is `to - 24h`.
    pub async fn get_stats_by_symbol(
        &self,
        symbol: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<RateStats> {
        let symbol = symbol.trim().to_uppercase();
        let coin = self
            .tracked
            .resolve(&symbol)
            .ok_or_else(|| Error::CoinNotFound(symbol.clone()))?;

        let to = to.unwrap_or_else(|| self.clock.now());
        let from = match from {
            Some(from) => from,
            None => hours_before(to, DEFAULT_WINDOW_HOURS)?,
        };
        if from > to {
            return Err(Error::ValidationError("window start is after window end".to_string()));
        }
        let threshold = hours_before(to, CHANGE_LOOKBACK_HOURS)?;

        let current = self
            .store
            .latest_for(&coin.symbol)
            .await?
            .ok_or_else(|| Error::NoPricesAvailable(coin.symbol.clone()))?;

        let window = self.store.range_for(&coin.symbol, from, to).await?;
        let summary = summarize_window(&window, threshold).ok_or_else(|| {
            Error::NoPricesAvailable(format!("{} between {} and {}", coin.symbol, from, to))
        })?;
        debug!(
            "{}: {} points in window, reference {:?}",
            coin.symbol,
            window.len(),
            summary.reference.as_ref().map(|p| p.timestamp)
        );

        let change = percent_change(&coin.symbol, current.value, summary.reference.as_ref())?;

        Ok(RateStats {
            symbol: coin.symbol.clone(),
            price: current.value,
            min_24h: Some(summary.min),
            max_24h: Some(summary.max),
            change_1h_pct: Some(change),
            updated_at: current.timestamp,
        })
    }
}

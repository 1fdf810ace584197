use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// A tracked asset. `symbol` is the canonical uppercase ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub symbol: String,
    /// Identifier used by the upstream price source (e.g. "bitcoin").
    pub provider_id: String,
}

impl Coin {
    pub fn new(symbol: &str, provider_id: &str) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            provider_id: provider_id.trim().to_string(),
        }
    }
}

/// The fixed set of assets the service reports on, ordered by symbol.
#[derive(Debug, Clone, Default)]
pub struct TrackedAssets {
    coins: Vec<Coin>,
}

impl TrackedAssets {
    pub fn new(mut coins: Vec<Coin>) -> Self {
        coins.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        coins.dedup_by(|a, b| a.symbol == b.symbol);
        Self { coins }
    }

    /// Case-insensitive lookup.
    pub fn resolve(&self, symbol: &str) -> Option<&Coin> {
        let symbol = symbol.trim().to_uppercase();
        self.coins.iter().find(|c| c.symbol == symbol)
    }

    pub fn is_tracked(&self, symbol: &str) -> bool {
        self.resolve(symbol).is_some()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.coins.iter().map(|c| c.symbol.as_str())
    }

    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }
}

/// One observed quote. Unique per `(symbol, timestamp)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub symbol: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl PricePoint {
    pub fn new(symbol: &str, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            value,
            timestamp,
        }
    }
}

/// Derived statistics for one symbol.
///
/// Snapshot entries produced by `RateAnalytics::get_all_latest` only carry the
/// latest price; the windowed fields are filled by `get_stats_by_symbol`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateStats {
    pub symbol: String,
    pub price: f64,
    pub min_24h: Option<f64>,
    pub max_24h: Option<f64>,
    pub change_1h_pct: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl From<PricePoint> for RateStats {
    fn from(point: PricePoint) -> Self {
        Self {
            symbol: point.symbol,
            price: point.value,
            min_24h: None,
            max_24h: None,
            change_1h_pct: None,
            updated_at: point.timestamp,
        }
    }
}

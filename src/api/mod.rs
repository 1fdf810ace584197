use crate::error::Result;
use crate::models::PricePoint;
use async_trait::async_trait;

pub mod coingecko;
pub mod types;

pub use coingecko::CoinGeckoClient;

/// Upstream provider of current quotes for the tracked set.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_current(&self) -> Result<Vec<PricePoint>>;
}

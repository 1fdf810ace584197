use serde::Deserialize;
use chrono::{DateTime, Utc};
use crate::error::{Result, Error};
use crate::models::PricePoint;

/// One row of the CoinGecko `/coins/markets` response.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketRow {
    pub id: String,
    pub symbol: String,
    pub current_price: Option<f64>,
}

impl MarketRow {
    fn validate(&self) -> Result<f64> {
        if self.symbol.trim().is_empty() {
            return Err(Error::ApiInvalidData(format!("Empty symbol for coin id '{}'", self.id)));
        }
        let price = self.current_price.ok_or_else(|| {
            Error::ApiInvalidData(format!("Missing price for {}", self.symbol))
        })?;
        if !price.is_finite() || price < 0.0 {
            return Err(Error::ApiInvalidData(format!(
                "Invalid price for {}: {}",
                self.symbol, price
            )));
        }
        Ok(price)
    }

    /// `fetched_at` stamps the point; the provider's own timestamp is not used
    /// so that one fetch produces one consistent instant across symbols.
    pub fn into_price_point(self, fetched_at: DateTime<Utc>) -> Result<PricePoint> {
        let price = self.validate()?;
        Ok(PricePoint::new(self.symbol.trim(), price, fetched_at))
    }
}

use chrono::Utc;
use log::{debug, error, warn};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use async_trait::async_trait;
use crate::api::PriceSource;
use crate::api::types::MarketRow;
use crate::config::CoinGeckoConfig;
use crate::error::{Result, Error};
use crate::models::{PricePoint, TrackedAssets};

const API_KEY_HEADER: &str = "x-cg-demo-api-key";

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    currency: String,
    api_key: Option<String>,
    provider_ids: Vec<String>,
}

impl CoinGeckoClient {
    pub fn new(config: &CoinGeckoConfig, tracked: &TrackedAssets) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            currency: config.currency.to_lowercase(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            provider_ids: tracked.coins().iter().map(|c| c.provider_id.clone()).collect(),
        })
    }

    fn markets_url(&self) -> String {
        format!("{}/coins/markets", self.base_url)
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("vs_currency", self.currency.clone()),
            ("ids", self.provider_ids.join(",")),
        ]
    }

    async fn fetch_rows(&self) -> Result<Vec<MarketRow>> {
        let mut request = self
            .client
            .get(self.markets_url())
            .query(&self.query())
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("CoinGecko request timed out: {}", e))
            } else {
                Error::NetworkError(format!("CoinGecko request failed: {}", e))
            }
        })?;

        check_status(response.status())?;
        let body = response.bytes().await.map_err(|e| {
            Error::NetworkError(format!("Failed to read CoinGecko response: {}", e))
        })?;
        parse_rows(&body)
    }
}

fn check_status(status: StatusCode) -> Result<()> {
    match status {
        status if status.is_success() => Ok(()),
        StatusCode::TOO_MANY_REQUESTS => {
            Err(Error::RateLimitExceeded("CoinGecko API rate limit exceeded".to_string()))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(Error::ApiError("CoinGecko rejected the API key".to_string()))
        }
        StatusCode::SERVICE_UNAVAILABLE => {
            Err(Error::ApiError("CoinGecko API is under maintenance".to_string()))
        }
        status => {
            let error_msg = format!("CoinGecko request failed with status: {}", status);
            error!("{}", error_msg);
            Err(Error::ApiError(error_msg))
        }
    }
}

fn parse_rows(body: &[u8]) -> Result<Vec<MarketRow>> {
    serde_json::from_slice(body).map_err(|e| {
        error!("Failed to parse CoinGecko response: {}", e);
        Error::ApiInvalidFormat(format!("Failed to parse response: {}", e))
    })
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn fetch_current(&self) -> Result<Vec<PricePoint>> {
        let rows = self.fetch_rows().await?;
        let fetched_at = Utc::now();
        debug!("CoinGecko returned {} market rows", rows.len());

        let mut points = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            match row.into_price_point(fetched_at) {
                Ok(point) => points.push(point),
                Err(e) => warn!("Skipping CoinGecko row '{}': {}", id, e),
            }
        }
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coin;

    fn client() -> CoinGeckoClient {
        let config = CoinGeckoConfig {
            base_url: "https://api.example.test/api/v3/".to_string(),
            currency: "USD".to_string(),
            ..CoinGeckoConfig::default()
        };
        let tracked = TrackedAssets::new(vec![
            Coin::new("BTC", "bitcoin"),
            Coin::new("ETH", "ethereum"),
        ]);
        CoinGeckoClient::new(&config, &tracked).unwrap()
    }

    #[test]
    fn test_markets_request_shape() {
        let client = client();
        assert_eq!(client.markets_url(), "https://api.example.test/api/v3/coins/markets");
        assert_eq!(
            client.query(),
            vec![
                ("vs_currency", "usd".to_string()),
                ("ids", "bitcoin,ethereum".to_string()),
            ]
        );
        assert!(client.api_key.is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert!(check_status(StatusCode::OK).is_ok());
        assert!(matches!(
            check_status(StatusCode::TOO_MANY_REQUESTS),
            Err(Error::RateLimitExceeded(_))
        ));
        for status in [
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            assert!(matches!(check_status(status), Err(Error::ApiError(_))), "{}", status);
        }
    }

    #[test]
    fn test_malformed_body_is_invalid_format() {
        assert!(matches!(parse_rows(b"<html>oops</html>"), Err(Error::ApiInvalidFormat(_))));
        assert!(matches!(
            parse_rows(br#"{"error":"coin not found"}"#),
            Err(Error::ApiInvalidFormat(_))
        ));

        let rows = parse_rows(br#"[{"id":"bitcoin","symbol":"btc","current_price":105.5}]"#).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].current_price, Some(105.5));
    }
}

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::fs;
use std::time::Duration;
use anyhow::{bail, Result};
use crate::models::{Coin, TrackedAssets};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub coingecko: CoinGeckoConfig,
    #[serde(default = "default_coins")]
    pub coins: Vec<CoinConfig>,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub addr: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct IngestionConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DispatchConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub snapshot_timeout_secs: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    pub currency: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CoinConfig {
    pub symbol: String,
    pub provider_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: String,
    pub default_interval_minutes: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 3,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Postgres,
            url: String::new(),
            max_connections: 10,
            acquire_timeout_secs: 5,
            run_migrations: true,
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self { enabled: true, interval_secs: 300, timeout_secs: 10 }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { enabled: true, interval_secs: 60, snapshot_timeout_secs: 4, timeout_secs: 30 }
    }
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            currency: "usd".to_string(),
            timeout_secs: 8,
            user_agent: "crypto-rates-bot/0.1".to_string(),
            api_key: None,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self { enabled: false, bot_token: String::new(), default_interval_minutes: 10 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), file: None }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            ingestion: IngestionConfig::default(),
            dispatch: DispatchConfig::default(),
            coingecko: CoinGeckoConfig::default(),
            coins: default_coins(),
            telegram: TelegramConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_coins() -> Vec<CoinConfig> {
    vec![
        CoinConfig { symbol: "BTC".to_string(), provider_id: "bitcoin".to_string() },
        CoinConfig { symbol: "ETH".to_string(), provider_id: "ethereum".to_string() },
    ]
}

impl Config {
    /// Reads the TOML file, applies `.env`/environment overrides and validates.
    pub fn load(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)?;
        let mut config = Self::from_toml(&config_str)?;
        dotenv::dotenv().ok();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        fs::write(path, config_str)?;
        Ok(())
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(addr) = lookup("HTTP_ADDR") {
            self.server.addr = addr;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.coins.is_empty() {
            bail!("at least one [[coins]] entry is required");
        }
        let tracked = self.tracked_assets();
        if tracked.len() != self.coins.len() {
            bail!("[[coins]] contains duplicate symbols");
        }
        if self.coins.iter().any(|c| c.symbol.trim().is_empty() || c.provider_id.trim().is_empty()) {
            bail!("[[coins]] entries need both symbol and provider_id");
        }
        if self.ingestion.interval_secs == 0 || self.ingestion.timeout_secs == 0 {
            bail!("ingestion.interval_secs and ingestion.timeout_secs must be > 0");
        }
        if self.dispatch.interval_secs == 0
            || self.dispatch.timeout_secs == 0
            || self.dispatch.snapshot_timeout_secs == 0
        {
            bail!("dispatch intervals and timeouts must be > 0");
        }
        if self.server.request_timeout_secs == 0 {
            bail!("server.request_timeout_secs must be > 0");
        }
        if self.database.backend == StorageBackend::Postgres && self.database.url.trim().is_empty() {
            bail!("database.url (or DATABASE_URL) is required for the postgres backend");
        }
        if self.telegram.enabled && self.telegram.bot_token.trim().is_empty() {
            bail!("telegram is enabled but bot_token (or TELEGRAM_BOT_TOKEN) is empty");
        }
        if self.telegram.default_interval_minutes <= 0 {
            bail!("telegram.default_interval_minutes must be > 0");
        }
        Ok(())
    }

    pub fn tracked_assets(&self) -> TrackedAssets {
        TrackedAssets::new(
            self.coins
                .iter()
                .map(|c| Coin::new(&c.symbol, &c.provider_id))
                .collect(),
        )
    }
}

impl IngestionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DispatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_secs(self.snapshot_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [database]
        backend = "memory"

        [ingestion]
        interval_secs = 120

        [[coins]]
        symbol = "btc"
        provider_id = "bitcoin"

        [telegram]
        enabled = true
        bot_token = "from-file"
    "#;

    #[test]
    fn test_parse_with_defaults() {
        let config = Config::from_toml(SAMPLE).unwrap();
        assert_eq!(config.database.backend, StorageBackend::Memory);
        assert_eq!(config.ingestion.interval(), Duration::from_secs(120));
        assert_eq!(config.ingestion.timeout_secs, 10);
        assert_eq!(config.dispatch.interval_secs, 60);
        assert_eq!(config.dispatch.snapshot_timeout_secs, 4);
        assert_eq!(config.tracked_assets().symbols().collect::<Vec<_>>(), vec!["BTC"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::from_toml(SAMPLE).unwrap();
        config.apply_env_overrides(|key| match key {
            "TELEGRAM_BOT_TOKEN" => Some("from-env".to_string()),
            "LOG_LEVEL" => Some("debug".to_string()),
            _ => None,
        });
        assert_eq!(config.telegram.bot_token, "from-env");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validation_rejects_zero_period() {
        let mut config = Config::from_toml(SAMPLE).unwrap();
        config.dispatch.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_requires_database_url_for_postgres() {
        let mut config = Config::from_toml(SAMPLE).unwrap();
        config.database.backend = StorageBackend::Postgres;
        assert!(config.validate().is_err());
        config.database.url = "postgres://localhost/rates".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = Config::from_toml(include_str!("../../config/config.toml")).unwrap();
        assert_eq!(config.database.backend, StorageBackend::Postgres);
        assert_eq!(config.coins.len(), 2);
        assert_eq!(config.telegram.default_interval_minutes, 10);
    }

    #[test]
    fn test_validation_rejects_duplicate_coins() {
        let mut config = Config::from_toml(SAMPLE).unwrap();
        config.coins.push(CoinConfig { symbol: "BTC".to_string(), provider_id: "bitcoin".to_string() });
        assert!(config.validate().is_err());
    }
}

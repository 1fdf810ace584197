use chrono::{DateTime, TimeZone, Utc};
use crate::models::{Coin, TrackedAssets};

/// Fixed "now" shared by unit tests: 2025-09-01 12:00:00 UTC.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap()
}

pub fn tracked() -> TrackedAssets {
    TrackedAssets::new(vec![
        Coin::new("BTC", "bitcoin"),
        Coin::new("ETH", "ethereum"),
    ])
}

use crate::models::RateStats;

const TIME_FORMAT: &str = "%H:%M:%S";

fn human_price(value: f64) -> String {
    format!("{:.2}", value)
}

/// One snapshot line, e.g. `BTC | price: 105.00 | updated: 12:00:00`.
pub fn format_rate_line(rate: &RateStats) -> String {
    format!(
        "{} | price: {} | updated: {}",
        rate.symbol,
        human_price(rate.price),
        rate.updated_at.format(TIME_FORMAT)
    )
}

/// The digest sent to subscribers: one line per symbol, in snapshot order.
pub fn render_digest(snapshot: &[RateStats]) -> String {
    snapshot
        .iter()
        .map(format_rate_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Detailed view for a single symbol. Windowed fields that are absent are
/// rendered as `n/a`.
pub fn format_rate_details(rate: &RateStats) -> String {
    let optional = |v: Option<f64>| v.map(human_price).unwrap_or_else(|| "n/a".to_string());
    let change = rate
        .change_1h_pct
        .map(|pct| format!("{:+.2}%", pct))
        .unwrap_or_else(|| "n/a".to_string());

    format!(
        "[{}]\nPrice: {}\n24h min: {}\n24h max: {}\n1h change: {}\nUpdated: {}",
        rate.symbol,
        human_price(rate.price),
        optional(rate.min_24h),
        optional(rate.max_24h),
        change,
        rate.updated_at.format(TIME_FORMAT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn rate(symbol: &str, price: f64) -> RateStats {
        RateStats {
            symbol: symbol.to_string(),
            price,
            min_24h: None,
            max_24h: None,
            change_1h_pct: None,
            updated_at: Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_digest_has_one_line_per_symbol() {
        let digest = render_digest(&[rate("BTC", 105.0), rate("ETH", 2.5)]);
        assert_eq!(
            digest,
            "BTC | price: 105.00 | updated: 12:00:00\nETH | price: 2.50 | updated: 12:00:00"
        );
    }

    #[test]
    fn test_details_show_signed_change() {
        let mut stats = rate("BTC", 105.0);
        stats.min_24h = Some(90.0);
        stats.max_24h = Some(110.0);
        stats.change_1h_pct = Some(5.0);

        let text = format_rate_details(&stats);
        assert!(text.starts_with("[BTC]\nPrice: 105.00"));
        assert!(text.contains("24h min: 90.00"));
        assert!(text.contains("1h change: +5.00%"));

        stats.change_1h_pct = Some(-1.234);
        assert!(format_rate_details(&stats).contains("1h change: -1.23%"));
    }
}

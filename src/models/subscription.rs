use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, Utc};

/// Opaque subscriber handle (a Telegram chat id).
pub type ChatId = i64;

/// Per-chat digest subscription state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub chat_id: ChatId,
    pub enabled: bool,
    pub interval_minutes: i32,
    pub last_sent_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Due iff enabled and never sent, or at least `interval_minutes` have
    /// elapsed since the last delivery. The boundary is inclusive.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        match self.last_sent_at {
            None => true,
            Some(last) => now - last >= Duration::minutes(i64::from(self.interval_minutes)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sub(enabled: bool, interval: i32, last: Option<DateTime<Utc>>) -> Subscription {
        Subscription { chat_id: 1, enabled, interval_minutes: interval, last_sent_at: last }
    }

    #[test]
    fn test_is_due_boundary_is_inclusive() {
        let now = Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap();

        assert!(sub(true, 10, None).is_due(now));
        assert!(sub(true, 10, Some(now - Duration::minutes(10))).is_due(now));
        assert!(!sub(true, 10, Some(now - Duration::minutes(9))).is_due(now));
        assert!(!sub(false, 10, None).is_due(now));
    }
}

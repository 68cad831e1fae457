//! Daily usage rule for the demo calling mode
//!
//! The record is device-scoped bookkeeping, not a security boundary. The
//! shell decides where it is stored.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Demo submissions allowed per calendar day
pub const DEMO_DAILY_LIMIT: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub day: Option<NaiveDate>,
    pub count: u32,
}

impl UsageRecord {
    /// Uses already recorded on `today`; a record from another day counts as zero
    pub fn uses_on(&self, today: NaiveDate) -> u32 {
        match self.day {
            Some(day) if day == today => self.count,
            _ => 0,
        }
    }

    pub fn used_today(&self, today: NaiveDate) -> bool {
        self.uses_on(today) >= DEMO_DAILY_LIMIT
    }

    /// Record one more use on `today`, resetting the count on a new day
    pub fn record(&self, today: NaiveDate) -> UsageRecord {
        UsageRecord {
            day: Some(today),
            count: self.uses_on(today).saturating_add(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fresh_record_is_unused() {
        let record = UsageRecord::default();
        assert!(!record.used_today(date(2024, 5, 1)));
    }

    #[test]
    fn test_record_marks_today_used() {
        let today = date(2024, 5, 1);
        let record = UsageRecord::default().record(today);
        assert!(record.used_today(today));
        assert_eq!(record.uses_on(today), 1);
    }

    #[test]
    fn test_new_day_resets() {
        let record = UsageRecord::default().record(date(2024, 5, 1));
        let tomorrow = date(2024, 5, 2);
        assert!(!record.used_today(tomorrow));
        assert_eq!(record.record(tomorrow).count, 1);
    }

    #[test]
    fn test_record_accumulates_within_day() {
        let today = date(2024, 5, 1);
        let record = UsageRecord::default().record(today).record(today);
        assert_eq!(record.count, 2);
    }
}

//! Retention horizon for history entries.

use chrono::{Duration, NaiveDate};

/// Oldest date that survives a sweep run on `today`.
///
/// Entries dated strictly before the cutoff are expired; entries on the
/// cutoff are kept.
pub fn retention_cutoff(today: NaiveDate, keep_days: u32) -> NaiveDate {
    today
        .checked_sub_signed(Duration::days(i64::from(keep_days)))
        .unwrap_or(NaiveDate::MIN)
}

pub fn is_expired(date: NaiveDate, cutoff: NaiveDate) -> bool {
    date < cutoff
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn cutoff_is_inclusive() {
        let today = day(2025, 3, 31);
        let cutoff = retention_cutoff(today, 30);
        assert_eq!(cutoff, day(2025, 3, 1));

        assert!(is_expired(day(2025, 2, 28), cutoff));
        assert!(!is_expired(day(2025, 3, 1), cutoff));
        assert!(!is_expired(today, cutoff));
    }
}

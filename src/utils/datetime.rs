//! Date, time and identity helpers
//!
//! All stored timestamps are UTC. Day boundaries used by the due-date filters
//! are computed in UTC as well so results do not depend on the host timezone.

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::constants::LOCAL_ID_PREFIX;

/// Current time, the single clock source for store timestamps
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Generate a fresh client-side task identity: `local_<millis>_<9 hex chars>`
pub fn generate_local_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}{}_{}", LOCAL_ID_PREFIX, now().timestamp_millis(), &random[..9])
}

/// Whether an id was generated on this device
pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

/// Absolute distance between two instants is strictly below `seconds`
pub fn within_window(a: &DateTime<Utc>, b: &DateTime<Utc>, seconds: i64) -> bool {
    (*a - *b).num_milliseconds().abs() < seconds * 1000
}

/// Midnight (UTC) of the day containing `at`
pub fn start_of_day(at: &DateTime<Utc>) -> DateTime<Utc> {
    let naive = at.date_naive().and_hms_opt(0, 0, 0).unwrap_or_else(|| at.naive_utc());
    Utc.from_utc_datetime(&naive)
}

/// `start_of_day(at)` shifted by whole days
pub fn day_offset(at: &DateTime<Utc>, days: i64) -> DateTime<Utc> {
    start_of_day(at) + Duration::days(days)
}

/// Same day of the next month, clamped to the month's last day
pub fn month_after(at: &DateTime<Utc>) -> DateTime<Utc> {
    let start = start_of_day(at);
    start
        .checked_add_months(chrono::Months::new(1))
        .unwrap_or_else(|| start + Duration::days(30))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_ids_are_prefixed_and_unique() {
        let a = generate_local_id();
        let b = generate_local_id();
        assert!(is_local_id(&a));
        assert_ne!(a, b);
        assert_eq!(a.rsplit('_').next().map(str::len), Some(9));
    }

    #[test]
    fn window_is_exclusive() {
        let a = Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap();
        assert!(within_window(&a, &(a + Duration::seconds(59)), 60));
        assert!(!within_window(&a, &(a + Duration::seconds(60)), 60));
        assert!(within_window(&(a + Duration::seconds(30)), &a, 60));
    }

    #[test]
    fn month_after_clamps_to_month_end() {
        let jan31 = Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap();
        assert_eq!(month_after(&jan31), Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap());
    }
}

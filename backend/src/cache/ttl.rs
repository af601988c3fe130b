use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::constants::MIN_INDEX_TTL_SECS;

/// Local calendar date of `now` in `tz`.
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// First instant of the local day after `now`.
///
/// When a DST transition skips midnight the first valid local time after
/// it is used instead.
pub fn next_local_midnight(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let tomorrow = local_date(now, tz)
        .checked_add_days(Days::new(1))
        .unwrap_or(NaiveDate::MAX);

    (0..24)
        .filter_map(|hour| tomorrow.and_hms_opt(hour, 0, 0))
        .find_map(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or(now + chrono::Duration::hours(24))
}

/// TTL for the "today" indexes: time left until the next local midnight.
pub fn until_next_midnight(now: DateTime<Utc>, tz: Tz) -> Duration {
    let remaining = (next_local_midnight(now, tz) - now)
        .to_std()
        .unwrap_or_default();
    remaining.max(Duration::from_secs(MIN_INDEX_TTL_SECS))
}

/// Whole seconds of `ttl`, rounded up so a key never outlives less than asked.
pub fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    let secs = if ttl.subsec_nanos() > 0 { secs + 1 } else { secs };
    secs.max(MIN_INDEX_TTL_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn ttl_runs_until_utc_midnight() {
        let now = utc("2025-03-10T22:30:00Z");
        assert_eq!(until_next_midnight(now, Tz::UTC), Duration::from_secs(90 * 60));
    }

    #[test]
    fn local_day_follows_timezone() {
        // 20:00 UTC is already 03:00 next day in Jakarta (UTC+7)
        let now = utc("2025-03-10T20:00:00Z");
        let jakarta = chrono_tz::Asia::Jakarta;
        assert_eq!(local_date(now, jakarta), NaiveDate::from_ymd_opt(2025, 3, 11).unwrap());
        assert_eq!(until_next_midnight(now, jakarta), Duration::from_secs(21 * 60 * 60));
    }

    #[test]
    fn ttl_never_zero_at_midnight() {
        let now = utc("2025-03-10T00:00:00Z");
        assert_eq!(until_next_midnight(now, Tz::UTC), Duration::from_secs(24 * 60 * 60));
        assert!(until_next_midnight(utc("2025-03-10T23:59:59.999Z"), Tz::UTC) >= Duration::from_secs(1));
    }

    #[test]
    fn skipped_midnight_uses_first_valid_hour() {
        // Santiago springs forward at local midnight on 2024-09-08
        let santiago = chrono_tz::America::Santiago;
        let now = utc("2024-09-07T12:00:00Z");
        let next = next_local_midnight(now, santiago);
        assert_eq!(next, utc("2024-09-08T04:00:00Z"));
    }

    #[test]
    fn ttl_secs_rounds_up() {
        assert_eq!(ttl_secs(Duration::from_millis(1500)), 2);
        assert_eq!(ttl_secs(Duration::from_secs(30)), 30);
        assert_eq!(ttl_secs(Duration::ZERO), 1);
    }
}

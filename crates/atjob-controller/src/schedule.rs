//! Schedule parsing.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use thiserror::Error;

/// The only accepted schedule format: a UTC timestamp like
/// `2030-01-01T12:00:00Z`.
pub const SCHEDULE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Schedule string did not match [`SCHEDULE_FORMAT`].
///
/// Fatal for the invocation that hit it: the job cannot progress until a
/// user edits the spec.
#[derive(Debug, Clone, Error)]
#[error("Invalid schedule {schedule:?}: {detail}")]
pub struct ScheduleError {
    /// The rejected input.
    pub schedule: String,
    /// Parser diagnostic.
    pub detail: String,
}

/// Time remaining until `schedule`, measured from `now`.
///
/// Negative means the schedule has already elapsed; callers treat any
/// non-positive remaining as "ready now".
pub fn remaining_at(schedule: &str, now: DateTime<Utc>) -> Result<TimeDelta, ScheduleError> {
    let parsed = NaiveDateTime::parse_from_str(schedule, SCHEDULE_FORMAT).map_err(|e| {
        ScheduleError {
            schedule: schedule.to_string(),
            detail: e.to_string(),
        }
    })?;
    Ok(parsed.and_utc() - now)
}

/// Time remaining until `schedule`, measured from the current UTC instant.
pub fn remaining(schedule: &str) -> Result<TimeDelta, ScheduleError> {
    remaining_at(schedule, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_future_schedule_is_positive() {
        let now = at(2030, 1, 1, 0, 0, 0);
        let d = remaining_at("2030-01-01T01:30:00Z", now).unwrap();
        assert_eq!(d, TimeDelta::minutes(90));
    }

    #[test]
    fn test_past_schedule_is_negative() {
        let now = at(2030, 1, 1, 1, 0, 0);
        let d = remaining_at("2030-01-01T00:00:00Z", now).unwrap();
        assert_eq!(d, TimeDelta::hours(-1));
    }

    #[test]
    fn test_exact_instant_is_zero() {
        let now = at(2030, 1, 1, 12, 0, 0);
        let d = remaining_at("2030-01-01T12:00:00Z", now).unwrap();
        assert_eq!(d, TimeDelta::zero());
        assert!(d <= TimeDelta::zero());
    }

    #[test]
    fn test_malformed_schedules_are_rejected() {
        let now = at(2030, 1, 1, 0, 0, 0);
        for bad in [
            "",
            "not a timestamp",
            "2030-01-01 12:00:00",
            "2030-01-01T12:00:00",
            "2030-01-01T12:00:00+02:00",
            "2030-01-01T12:00:00Z extra",
            "2030-13-01T12:00:00Z",
        ] {
            let err = remaining_at(bad, now).unwrap_err();
            assert_eq!(err.schedule, bad);
        }
    }

    #[test]
    fn test_remaining_tracks_wall_clock() {
        let d = remaining("2099-01-01T00:00:00Z").unwrap();
        assert!(d > TimeDelta::zero());

        let d = remaining("1999-01-01T00:00:00Z").unwrap();
        assert!(d < TimeDelta::zero());
    }
}

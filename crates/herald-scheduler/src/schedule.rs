//! Due-instant computation for both trigger kinds, calendar-correct in the
//! operating zone.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use chrono_tz::Tz;

use crate::types::Trigger;

/// Compute the next UTC due instant for `trigger` strictly after `after`.
///
/// Returns `None` when the trigger is exhausted (a one-shot whose instant
/// has already passed). A daily trigger always has a next occurrence.
pub fn next_occurrence(trigger: &Trigger, tz: Tz, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match trigger {
        Trigger::At { instant } => {
            if *instant > after {
                Some(*instant)
            } else {
                None
            }
        }

        Trigger::Daily {
            hour,
            minute,
            second,
        } => {
            // Build today's candidate at H:MM:SS in the operating zone.
            let local_after = after.with_timezone(&tz);
            let mut date = local_after.date_naive();
            loop {
                if let Some(candidate) = tz
                    .with_ymd_and_hms(
                        date.year(),
                        date.month(),
                        date.day(),
                        *hour,
                        *minute,
                        *second,
                    )
                    .earliest()
                {
                    let candidate_utc = candidate.with_timezone(&Utc);
                    if candidate_utc > after {
                        return Some(candidate_utc);
                    }
                }
                // Today's window has passed (or the local time does not
                // exist on this date) — advance one calendar day.
                date = date.succ_opt()?;
            }
        }
    }
}

/// The due instant a freshly stored spec starts from.
///
/// One-shots keep their absolute instant even when it is already in the
/// past — the misfire policy, not insertion, decides whether a late
/// occurrence still fires.
pub fn initial_due(trigger: &Trigger, tz: Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    match trigger {
        Trigger::At { instant } => *instant,
        Trigger::Daily { .. } => {
            // A daily trigger always yields an occurrence within 24h.
            next_occurrence(trigger, tz, now).unwrap_or(now + Duration::days(1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Africa::Lagos;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .expect("test timestamp")
            .with_timezone(&Utc)
    }

    #[test]
    fn daily_same_day_when_time_still_ahead() {
        // 06:00 UTC = 07:00 Lagos; 08:00 Lagos is still ahead today.
        let after = utc("2024-03-01T06:00:00+00:00");
        let trigger = Trigger::Daily {
            hour: 8,
            minute: 0,
            second: 0,
        };
        let next = next_occurrence(&trigger, Lagos, after).expect("next");
        assert_eq!(next, utc("2024-03-01T07:00:00+00:00")); // 08:00 +01:00
    }

    #[test]
    fn daily_rolls_to_next_day_when_time_passed() {
        // 09:30 Lagos — today's 08:00 already passed.
        let after = utc("2024-03-01T08:30:00+00:00");
        let trigger = Trigger::Daily {
            hour: 8,
            minute: 0,
            second: 0,
        };
        let next = next_occurrence(&trigger, Lagos, after).expect("next");
        assert_eq!(next, utc("2024-03-02T07:00:00+00:00"));
    }

    #[test]
    fn daily_respects_seconds() {
        let after = utc("2024-03-01T06:00:00+00:00");
        let trigger = Trigger::Daily {
            hour: 8,
            minute: 15,
            second: 42,
        };
        let next = next_occurrence(&trigger, Lagos, after).expect("next");
        assert_eq!(next, utc("2024-03-01T07:15:42+00:00"));
    }

    #[test]
    fn daily_exactly_at_due_advances_to_tomorrow() {
        // "strictly after": the current occurrence is not returned again.
        let due = utc("2024-03-01T07:00:00+00:00");
        let trigger = Trigger::Daily {
            hour: 8,
            minute: 0,
            second: 0,
        };
        let next = next_occurrence(&trigger, Lagos, due).expect("next");
        assert_eq!(next, utc("2024-03-02T07:00:00+00:00"));
    }

    #[test]
    fn daily_crosses_month_and_year_boundaries() {
        let after = utc("2024-12-31T23:30:00+00:00"); // 00:30 Jan 1, Lagos
        let trigger = Trigger::Daily {
            hour: 0,
            minute: 15,
            second: 0,
        };
        let next = next_occurrence(&trigger, Lagos, after).expect("next");
        assert_eq!(next, utc("2025-01-01T23:15:00+00:00")); // Jan 2, 00:15 +01:00
    }

    #[test]
    fn one_shot_future_instant_passes_through() {
        let instant = utc("2024-03-05T14:30:00+00:00");
        let trigger = Trigger::At { instant };
        let after = utc("2024-03-01T00:00:00+00:00");
        assert_eq!(next_occurrence(&trigger, Lagos, after), Some(instant));
    }

    #[test]
    fn one_shot_past_instant_is_exhausted() {
        let instant = utc("2024-03-05T14:30:00+00:00");
        let trigger = Trigger::At { instant };
        assert_eq!(next_occurrence(&trigger, Lagos, instant), None);
        assert_eq!(
            next_occurrence(&trigger, Lagos, instant + Duration::hours(1)),
            None
        );
    }

    #[test]
    fn initial_due_keeps_past_one_shot_instant() {
        // Misfire policy, not insertion, decides what happens to late jobs.
        let instant = utc("2024-03-05T14:30:00+00:00");
        let trigger = Trigger::At { instant };
        let now = instant + Duration::hours(2);
        assert_eq!(initial_due(&trigger, Lagos, now), instant);
    }
}

use chrono::{DateTime, TimeZone};
use std::fmt;

use crate::models::DueDate;

const MILLIS_PER_MINUTE: u64 = 60_000;
const MINUTES_PER_HOUR: u64 = 60;
const MINUTES_PER_DAY: u64 = 24 * MINUTES_PER_HOUR;

/// Time left until (or elapsed since) a todo's effective deadline.
///
/// The magnitude is always non-negative; `is_overdue` carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remaining {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub total_minutes: u64,
    pub is_overdue: bool,
}

impl Remaining {
    /// Build a value from already decomposed parts.
    /// `total_minutes` saturates at `u64::MAX`.
    pub fn from_parts(days: u64, hours: u64, minutes: u64, is_overdue: bool) -> Self {
        let total_minutes = days
            .saturating_mul(MINUTES_PER_DAY)
            .saturating_add(hours.saturating_mul(MINUTES_PER_HOUR))
            .saturating_add(minutes);
        Self {
            days,
            hours,
            minutes,
            total_minutes,
            is_overdue,
        }
    }

    fn from_total_minutes(total_minutes: u64, is_overdue: bool) -> Self {
        Self {
            days: total_minutes / MINUTES_PER_DAY,
            hours: (total_minutes % MINUTES_PER_DAY) / MINUTES_PER_HOUR,
            minutes: total_minutes % MINUTES_PER_HOUR,
            total_minutes,
            is_overdue,
        }
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_remaining(self))
    }
}

/// The instant a due date actually expires: 23:59:59.999 on its calendar day,
/// in the offset the due date carries.
pub fn effective_deadline(due: &DueDate) -> DueDate {
    due.date_naive()
        .and_hms_milli_opt(23, 59, 59, 999)
        .and_then(|end_of_day| end_of_day.and_local_timezone(*due.offset()).single())
        .unwrap_or(*due)
}

/// Compute the time between `now` and the effective deadline of `due`.
pub fn remaining<Tz: TimeZone>(due: &DueDate, now: &DateTime<Tz>) -> Remaining {
    let diff_ms = effective_deadline(due).timestamp_millis() - now.timestamp_millis();
    let total_minutes = diff_ms.unsigned_abs() / MILLIS_PER_MINUTE;
    Remaining::from_total_minutes(total_minutes, diff_ms < 0)
}

/// Render a countdown using only its most significant tier.
pub fn format_remaining(remaining: &Remaining) -> String {
    if remaining.is_overdue {
        if remaining.days > 0 {
            format!("{}d overdue", remaining.days)
        } else if remaining.hours > 0 {
            format!("{}h {}m overdue", remaining.hours, remaining.minutes)
        } else {
            format!("{}m overdue", remaining.minutes)
        }
    } else if remaining.days > 0 {
        format!("{}d {}h remaining", remaining.days, remaining.hours)
    } else if remaining.hours > 0 {
        format!("{}h {}m remaining", remaining.hours, remaining.minutes)
    } else {
        format!("{}m remaining", remaining.minutes)
    }
}

//! Derived attendance views.
//!
//! Nothing here is persisted. Every view is computed from a snapshot of the
//! records and an explicit `now`, so results depend only on their inputs.
//! Day and week boundaries are local calendar boundaries of `now`.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Days, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::model::AttendanceRecord;

/// Today's headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    /// Number of registered users.
    pub total_users: usize,
    /// Distinct names marked present today.
    pub present_today: usize,
    /// Registered users not marked present today.
    pub absent_today: usize,
    /// `present_today / total_users` as a percentage, 0 with no users.
    pub attendance_rate: f64,
}

impl DailySummary {
    /// Compute the summary for the local day containing `now`.
    #[must_use]
    pub fn compute<Tz: TimeZone>(
        total_users: usize,
        records: &[AttendanceRecord],
        now: &DateTime<Tz>,
    ) -> Self {
        let today = now.date_naive();
        let tz = now.timezone();
        let present: HashSet<&str> = records
            .iter()
            .filter(|r| r.is_present() && local_date(&r.timestamp, &tz) == today)
            .map(|r| r.name.as_str())
            .collect();

        let present_today = present.len();
        #[allow(clippy::cast_precision_loss)]
        let attendance_rate = if total_users == 0 {
            0.0
        } else {
            present_today as f64 / total_users as f64 * 100.0
        };

        Self {
            total_users,
            present_today,
            absent_today: total_users.saturating_sub(present_today),
            attendance_rate,
        }
    }
}

/// Per-person attendance overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserActivity {
    /// Name the records were logged under.
    pub name: String,
    /// Marked present on the local day of `now`.
    pub present_today: bool,
    /// Present records since the start of the week.
    pub weekly_count: usize,
    /// Newest present record.
    pub last_seen: DateTime<Utc>,
}

/// Summarize every name that has at least one `present` record.
///
/// Entries follow the order in which names first appear in `records`, so for
/// a newest-first list the most recently seen person comes first. Weeks start
/// at local midnight on Sunday.
#[must_use]
pub fn user_activity<Tz: TimeZone>(
    records: &[AttendanceRecord],
    now: &DateTime<Tz>,
) -> Vec<UserActivity> {
    let tz = now.timezone();
    let today = now.date_naive();
    let week_start = week_start(today);

    let mut activity: Vec<UserActivity> = Vec::new();
    for record in records.iter().filter(|r| r.is_present()) {
        let day = local_date(&record.timestamp, &tz);
        let entry = match activity.iter().position(|a| a.name == record.name) {
            Some(i) => &mut activity[i],
            None => {
                activity.push(UserActivity {
                    name: record.name.clone(),
                    present_today: false,
                    weekly_count: 0,
                    last_seen: record.timestamp,
                });
                let last = activity.len() - 1;
                &mut activity[last]
            }
        };

        entry.present_today |= day == today;
        if day >= week_start && day <= today {
            entry.weekly_count += 1;
        }
        if record.timestamp > entry.last_seen {
            entry.last_seen = record.timestamp;
        }
    }
    activity
}

/// Newest `present` timestamp recorded for `name`.
#[must_use]
pub fn last_attendance(records: &[AttendanceRecord], name: &str) -> Option<DateTime<Utc>> {
    records
        .iter()
        .filter(|r| r.is_present() && r.name == name)
        .map(|r| r.timestamp)
        .max()
}

/// Default file name for an export taken at `now`.
#[must_use]
pub fn export_file_name(now: &DateTime<Local>) -> String {
    format!("attendance-data-{}.json", now.format("%Y-%m-%d"))
}

fn local_date<Tz: TimeZone>(timestamp: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    timestamp.with_timezone(tz).date_naive()
}

fn week_start(day: NaiveDate) -> NaiveDate {
    let offset = u64::from(day.weekday().num_days_from_sunday());
    day.checked_sub_days(Days::new(offset)).unwrap_or(day)
}

// 📅 Week Calendar - Display weeks vs continuous weeks
//
// Two week numbers per date:
// 1. Display week: ISO week of the Monday (resets to 1 every year)
// 2. Continuous week: weeks since a fixed reference Monday, never resets
//
// Rotation math always uses the continuous week. ISO weeks jump from
// 52/53 back to 1, which would make the cycle position skip and repeat.

use crate::error::{RotationError, RotationResult};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

/// Monday of ISO week 1 of 2026: continuous weeks equal ISO weeks for all of 2026
pub fn default_reference_monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 29).unwrap_or_default()
}

/// Monday of the week containing `date`
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// ISO week number, used for display only
pub fn iso_week(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

/// floor((monday - reference) / 7) + 1
///
/// Dates before the reference give zero or negative weeks; callers only
/// pass dates at or after deployment.
pub fn continuous_week(monday: NaiveDate, reference_monday: NaiveDate) -> i64 {
    (monday - reference_monday).num_days().div_euclid(7) + 1
}

// ============================================================================
// WEEK CALENDAR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekCalendar {
    reference_monday: NaiveDate,
}

impl WeekCalendar {
    pub fn new(reference_monday: NaiveDate) -> RotationResult<Self> {
        if reference_monday.weekday() != Weekday::Mon {
            return Err(RotationError::invalid(format!(
                "reference date {} is not a Monday",
                reference_monday
            )));
        }
        Ok(WeekCalendar { reference_monday })
    }

    pub fn reference_monday(&self) -> NaiveDate {
        self.reference_monday
    }

    /// Continuous week of the week containing `date`
    pub fn continuous_week(&self, date: NaiveDate) -> i64 {
        continuous_week(monday_of(date), self.reference_monday)
    }

    /// First day of a continuous week
    pub fn monday_of_week(&self, week: i64) -> RotationResult<NaiveDate> {
        week.checked_sub(1)
            .and_then(Duration::try_weeks)
            .and_then(|offset| self.reference_monday.checked_add_signed(offset))
            .ok_or(RotationError::WeekOutOfRange(week))
    }

    pub fn context(&self, today: NaiveDate) -> WeekContext {
        let monday = monday_of(today);

        WeekContext {
            today,
            monday,
            display_week: iso_week(monday),
            continuous_week: continuous_week(monday, self.reference_monday),
        }
    }
}

impl Default for WeekCalendar {
    fn default() -> Self {
        WeekCalendar {
            reference_monday: default_reference_monday(),
        }
    }
}

// ============================================================================
// WEEK CONTEXT
// ============================================================================

/// Everything a run needs to know about "this week"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekContext {
    pub today: NaiveDate,
    pub monday: NaiveDate,
    pub display_week: u32,
    pub continuous_week: i64,
}

impl WeekContext {
    pub fn sunday(&self) -> NaiveDate {
        self.monday + Duration::days(6)
    }

    pub fn weekday(&self) -> Weekday {
        self.today.weekday()
    }

    pub fn is_monday(&self) -> bool {
        self.weekday() == Weekday::Mon
    }

    /// "December 29 - January 04, 2026"
    pub fn date_range(&self) -> String {
        format!(
            "{} - {}",
            self.monday.format("%B %d"),
            self.sunday().format("%B %d, %Y")
        )
    }

    /// "Dec 29-04, 2026", as used in mail subjects
    pub fn short_range(&self) -> String {
        format!(
            "{}-{}",
            self.monday.format("%b %d"),
            self.sunday().format("%d, %Y")
        )
    }
}

/// Full English weekday name
pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Monday through Sunday
pub const WEEK_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

// ============================================================================
// TESTS
// ============================================================================

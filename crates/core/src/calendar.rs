//! Business-day arithmetic
//!
//! Daily payments collect on business days only. Weekends are skipped;
//! holiday calendars are supplied by an external collaborator and are
//! out of scope here.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// True if the date falls on a weekday
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The first business day strictly after `date`
pub fn next_business_day(date: NaiveDate) -> NaiveDate {
    let mut next = date + Duration::days(1);
    while !is_business_day(next) {
        next += Duration::days(1);
    }
    next
}

/// The first business day on or after `date`
pub fn business_day_on_or_after(date: NaiveDate) -> NaiveDate {
    if is_business_day(date) {
        date
    } else {
        next_business_day(date)
    }
}

/// Number of business days between two dates, ignoring direction.
///
/// Counts the business days strictly after the earlier date up to and
/// including the later date, so same-day distance is 0 and consecutive
/// weekdays are 1 apart.
pub fn business_days_between(a: NaiveDate, b: NaiveDate) -> u32 {
    let (mut from, to) = if a <= b { (a, b) } else { (b, a) };
    let mut count = 0;
    while from < to {
        from += Duration::days(1);
        if is_business_day(from) {
            count += 1;
        }
    }
    count
}

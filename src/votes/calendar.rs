//! Trade date / vote date mapping

use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Next weekday strictly after `date`
pub fn next_business_day(date: NaiveDate) -> NaiveDate {
    let mut next = date + Duration::days(1);
    while is_weekend(next) {
        next += Duration::days(1);
    }
    next
}

/// Vote date whose results are traded on `trade_date`.
///
/// Monday trades on the preceding Saturday, Wednesday on the preceding
/// Tuesday. Every other day returns `None` and is not a rebalance day.
pub fn vote_date_for(trade_date: NaiveDate) -> Option<NaiveDate> {
    match trade_date.weekday() {
        Weekday::Mon => Some(trade_date - Duration::days(2)),
        Weekday::Wed => Some(trade_date - Duration::days(1)),
        _ => None,
    }
}

/// Trade date driven by a vote date (inverse of [`vote_date_for`])
pub fn trade_date_for(vote_date: NaiveDate) -> Option<NaiveDate> {
    matches!(vote_date.weekday(), Weekday::Sat | Weekday::Tue)
        .then(|| next_business_day(vote_date))
}

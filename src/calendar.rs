use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Tokyo Stock Exchange sessions: weekdays, minus the Dec 31 - Jan 3 closure
/// and whatever public holidays the caller supplies.
#[derive(Debug, Clone, Default)]
pub struct TradingCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl TradingCalendar {
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let year_end = (date.month() == 12 && date.day() == 31)
            || (date.month() == 1 && date.day() <= 3);
        !year_end && !self.holidays.contains(&date)
    }

    /// First session strictly after `date`.
    pub fn next_trading_day(&self, date: NaiveDate) -> Option<NaiveDate> {
        let mut d = date.checked_add_days(Days::new(1))?;
        // Longest closure is a long weekend around new year; a year bounds it.
        for _ in 0..366 {
            if self.is_trading_day(d) {
                return Some(d);
            }
            d = d.checked_add_days(Days::new(1))?;
        }
        None
    }

    /// Last session strictly before `date`.
    pub fn previous_trading_day(&self, date: NaiveDate) -> Option<NaiveDate> {
        let mut d = date.checked_sub_days(Days::new(1))?;
        for _ in 0..366 {
            if self.is_trading_day(d) {
                return Some(d);
            }
            d = d.checked_sub_days(Days::new(1))?;
        }
        None
    }
}

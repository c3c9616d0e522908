use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

use super::bars::{DailyBar, IntradayBar, load_daily_bars, load_intraday_bars};

/// Price lookup by ticker and trading day.
#[derive(Debug, Default)]
pub struct PriceBook {
    daily: HashMap<String, Vec<DailyBar>>,
    intraday: HashMap<(String, NaiveDate), Vec<IntradayBar>>,
}

impl PriceBook {
    pub fn new(daily: Vec<DailyBar>, intraday: Vec<IntradayBar>) -> Self {
        let mut book = Self::default();
        for bar in daily {
            book.daily.entry(bar.ticker.clone()).or_default().push(bar);
        }
        for bars in book.daily.values_mut() {
            // Duplicate dates keep the bar loaded last, as the intraday merge does.
            // Reversing first lets the stable sort put that bar ahead of the others.
            bars.reverse();
            bars.sort_by_key(|b| b.date);
            bars.dedup_by_key(|b| b.date);
        }
        for bar in intraday {
            book.intraday
                .entry((bar.ticker.clone(), bar.date()))
                .or_default()
                .push(bar);
        }
        for bars in book.intraday.values_mut() {
            bars.sort_by_key(|b| b.ts);
        }
        book
    }

    pub fn load(daily_prices: &Path, intraday_prices: &[PathBuf]) -> Result<Self> {
        let daily = load_daily_bars(daily_prices)
            .with_context(|| format!("failed to load daily prices from {:?}", daily_prices))?;
        let intraday = load_intraday_bars(intraday_prices)?;
        let book = Self::new(daily, intraday);
        info!(
            daily = book.daily_len(),
            intraday = book.intraday_len(),
            tickers = book.daily.len(),
            "price book loaded"
        );
        Ok(book)
    }

    pub fn daily(&self, ticker: &str, date: NaiveDate) -> Option<&DailyBar> {
        let bars = self.daily.get(ticker)?;
        bars.binary_search_by_key(&date, |b| b.date)
            .ok()
            .map(|i| &bars[i])
    }

    /// Every daily bar strictly before `date`, oldest first.
    pub fn daily_before(&self, ticker: &str, date: NaiveDate) -> &[DailyBar] {
        let Some(bars) = self.daily.get(ticker) else {
            return &[];
        };
        let end = bars.partition_point(|b| b.date < date);
        &bars[..end]
    }

    pub fn daily_history(&self, ticker: &str) -> &[DailyBar] {
        self.daily.get(ticker).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The 5-minute bars of one session, in time order.
    pub fn intraday(&self, ticker: &str, date: NaiveDate) -> &[IntradayBar] {
        self.intraday
            .get(&(ticker.to_string(), date))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn tickers(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.daily.keys().map(String::as_str).collect();
        out.sort_unstable();
        out
    }

    pub fn daily_len(&self) -> usize {
        self.daily.values().map(Vec::len).sum()
    }

    pub fn intraday_len(&self) -> usize {
        self.intraday.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, day).unwrap()
    }

    fn daily(ticker: &str, day: u32, close: f64) -> DailyBar {
        DailyBar {
            ticker: ticker.to_string(),
            date: d(day),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }

    fn intraday(ticker: &str, day: u32, h: u32, m: u32) -> IntradayBar {
        IntradayBar {
            ticker: ticker.to_string(),
            ts: d(day).and_hms_opt(h, m, 0).unwrap(),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: Some(1.0),
            volume: 0.0,
        }
    }

    #[test]
    fn test_daily_lookup_sorted_regardless_of_input_order() {
        let book = PriceBook::new(
            vec![daily("A", 3, 3.0), daily("A", 1, 1.0), daily("A", 2, 2.0)],
            vec![],
        );
        assert_eq!(book.daily("A", d(2)).unwrap().close, 2.0);
        assert!(book.daily("A", d(4)).is_none());
        assert!(book.daily("B", d(1)).is_none());
        assert_eq!(book.daily_history("A").len(), 3);
    }

    #[test]
    fn test_duplicate_daily_date_keeps_later_bar() {
        let book = PriceBook::new(
            vec![
                daily("A", 2, 20.0),
                daily("A", 1, 1.0),
                daily("A", 2, 21.0),
                daily("A", 2, 22.0),
            ],
            vec![],
        );
        assert_eq!(book.daily_history("A").len(), 2);
        assert_eq!(book.daily("A", d(2)).unwrap().close, 22.0);
        assert_eq!(book.daily("A", d(1)).unwrap().close, 1.0);
    }

    #[test]
    fn test_daily_before_excludes_the_date_itself() {
        let book = PriceBook::new(
            vec![daily("A", 1, 1.0), daily("A", 2, 2.0), daily("A", 3, 3.0)],
            vec![],
        );
        let hist = book.daily_before("A", d(3));
        assert_eq!(hist.len(), 2);
        assert_eq!(hist.last().unwrap().date, d(2));
        assert!(book.daily_before("A", d(1)).is_empty());
        assert!(book.daily_before("Z", d(3)).is_empty());
    }

    #[test]
    fn test_intraday_grouped_per_session_in_time_order() {
        let book = PriceBook::new(
            vec![],
            vec![
                intraday("A", 1, 10, 0),
                intraday("A", 1, 9, 0),
                intraday("A", 2, 9, 0),
            ],
        );
        let day1 = book.intraday("A", d(1));
        assert_eq!(day1.len(), 2);
        assert!(day1[0].ts < day1[1].ts);
        assert_eq!(book.intraday("A", d(2)).len(), 1);
        assert!(book.intraday("A", d(3)).is_empty());
        assert_eq!(book.intraday_len(), 3);
    }
}

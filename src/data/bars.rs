use anyhow::{Context, Result, bail};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::parse::{parse_number, read_csv_bytes};

/// Tokyo has no DST, so a fixed +09:00 offset is exact.
const JST_OFFSET_SECS: i32 = 9 * 3600;

#[derive(Debug, Deserialize)]
struct DailyRow {
    ticker: String,
    date: String,
    #[serde(alias = "Open")]
    open: String,
    #[serde(alias = "High")]
    high: String,
    #[serde(alias = "Low")]
    low: String,
    #[serde(alias = "Close")]
    close: String,
    #[serde(alias = "Volume", default)]
    volume: String,
}

#[derive(Debug, Deserialize)]
struct IntradayRow {
    ticker: String,
    #[serde(alias = "date", alias = "Datetime")]
    datetime: String,
    #[serde(alias = "Open")]
    open: String,
    #[serde(alias = "High")]
    high: String,
    #[serde(alias = "Low")]
    low: String,
    #[serde(alias = "Close")]
    close: String,
    #[serde(alias = "Volume", default)]
    volume: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// One 5-minute bar. `ts` is the bar START in Tokyo local time,
/// so the 09:30 bar opens at 09:30 and closes at 09:35.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntradayBar {
    pub ticker: String,
    pub ts: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    /// Missing when the feed reported NaN for the bar.
    pub close: Option<f64>,
    pub volume: f64,
}

impl IntradayBar {
    pub fn date(&self) -> NaiveDate {
        self.ts.date()
    }

    pub fn time(&self) -> NaiveTime {
        self.ts.time()
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let head = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Parse a bar timestamp and express it in Tokyo local time.
///
/// Offset-carrying forms are converted; naive forms are assumed to be JST already.
pub fn parse_jst_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    let jst = FixedOffset::east_opt(JST_OFFSET_SECS)?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&jst).naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.with_timezone(&jst).naive_local());
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

pub fn load_daily_bars(input: &Path) -> Result<Vec<DailyBar>> {
    let mut rdr = read_csv_bytes(input)?;
    let mut bars = Vec::new();
    let mut skipped = 0usize;

    for result in rdr.deserialize::<DailyRow>() {
        let row: DailyRow = result.with_context(|| "failed to deserialize CSV row")?;
        let parsed = parse_date(&row.date).zip(
            parse_number(&row.open)
                .zip(parse_number(&row.high))
                .zip(parse_number(&row.low).zip(parse_number(&row.close))),
        );
        let Some((date, ((open, high), (low, close)))) = parsed else {
            skipped += 1;
            debug!(ticker = %row.ticker, date = %row.date, "skipping daily row without OHLC");
            continue;
        };
        bars.push(DailyBar {
            ticker: row.ticker,
            date,
            open,
            high,
            low,
            close,
            volume: parse_number(&row.volume).unwrap_or(0.0),
        });
    }

    if skipped > 0 {
        warn!(file = ?input, skipped, "daily rows skipped");
    }
    Ok(bars)
}

fn load_intraday_file(input: &Path) -> Result<Vec<IntradayBar>> {
    let mut rdr = read_csv_bytes(input)?;
    let mut bars = Vec::new();
    let mut skipped = 0usize;

    for result in rdr.deserialize::<IntradayRow>() {
        let row: IntradayRow = result.with_context(|| "failed to deserialize CSV row")?;
        let Some(ts) = parse_jst_timestamp(&row.datetime) else {
            skipped += 1;
            debug!(ticker = %row.ticker, datetime = %row.datetime, "skipping intraday row with bad timestamp");
            continue;
        };
        // A bar without an open carries no tradable price at all.
        let Some(open) = parse_number(&row.open) else {
            continue;
        };
        bars.push(IntradayBar {
            ticker: row.ticker,
            ts,
            open,
            high: parse_number(&row.high).unwrap_or(open),
            low: parse_number(&row.low).unwrap_or(open),
            close: parse_number(&row.close),
            volume: parse_number(&row.volume).unwrap_or(0.0),
        });
    }

    if skipped > 0 {
        warn!(file = ?input, skipped, "intraday rows skipped");
    }
    Ok(bars)
}

/// Load and merge several 5-minute files. Missing files are skipped.
pub fn load_intraday_bars(inputs: &[PathBuf]) -> Result<Vec<IntradayBar>> {
    let mut all = Vec::new();
    let mut loaded = 0usize;

    for input in inputs {
        if !input.exists() {
            warn!(file = ?input, "intraday file not found, skipping");
            continue;
        }
        let bars = load_intraday_file(input)?;
        debug!(file = ?input, rows = bars.len(), "loaded intraday file");
        all.extend(bars);
        loaded += 1;
    }

    if loaded == 0 && !inputs.is_empty() {
        bail!("none of the {} intraday files could be found", inputs.len());
    }
    Ok(dedupe_intraday(all))
}

/// Collapse duplicate `(ticker, ts)` bars, keeping the one seen last.
pub fn dedupe_intraday(bars: Vec<IntradayBar>) -> Vec<IntradayBar> {
    let mut buckets: BTreeMap<(String, NaiveDateTime), IntradayBar> = BTreeMap::new();

    for bar in bars {
        // Inserting again for the same key overwrites with the later file's bar.
        buckets.insert((bar.ticker.clone(), bar.ts), bar);
    }

    buckets.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn bar(ticker: &str, at: NaiveDateTime, open: f64) -> IntradayBar {
        IntradayBar {
            ticker: ticker.to_string(),
            ts: at,
            open,
            high: open,
            low: open,
            close: Some(open),
            volume: 100.0,
        }
    }

    fn temp_csv(name: &str, body: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("trend_backtest_bars_{}_{name}", std::process::id()));
        std::fs::write(&p, body).unwrap();
        p
    }

    #[test]
    fn test_parse_jst_timestamp_converts_utc_to_tokyo() {
        let got = parse_jst_timestamp("2025-12-01T00:30:00Z").unwrap();
        assert_eq!(got, ts(2025, 12, 1, 9, 30));
    }

    #[test]
    fn test_parse_jst_timestamp_accepts_pandas_offset_form() {
        let got = parse_jst_timestamp("2025-12-01 10:25:00+09:00").unwrap();
        assert_eq!(got, ts(2025, 12, 1, 10, 25));
    }

    #[test]
    fn test_parse_jst_timestamp_naive_is_taken_as_jst() {
        assert_eq!(
            parse_jst_timestamp("2025-12-01 14:45").unwrap(),
            ts(2025, 12, 1, 14, 45)
        );
        assert!(parse_jst_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_parse_date_accepts_datetime_prefix() {
        let d = NaiveDate::from_ymd_opt(2025, 11, 28).unwrap();
        assert_eq!(parse_date("2025-11-28"), Some(d));
        assert_eq!(parse_date("2025-11-28 00:00:00"), Some(d));
        assert_eq!(parse_date("28/11/2025"), None);
    }

    #[test]
    fn test_dedupe_intraday_keeps_last_duplicate_and_orders() {
        let t = ts(2025, 12, 1, 9, 0);
        let later = ts(2025, 12, 1, 9, 5);
        let bars = vec![
            bar("7203.T", later, 3.0),
            bar("7203.T", t, 1.0),
            bar("6758.T", t, 9.0),
            bar("7203.T", t, 2.0),
        ];

        let out = dedupe_intraday(bars);

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].ticker, "6758.T");
        assert_eq!(out[1].ts, t);
        assert_eq!(out[1].open, 2.0);
        assert_eq!(out[2].ts, later);
    }

    #[test]
    fn test_load_daily_bars_handles_capitalized_headers_and_bad_rows() {
        let path = temp_csv(
            "daily.csv",
            "ticker,date,Open,High,Low,Close,Volume\n\
             7203.T,2025-12-01,100,110,95,105,1000\n\
             7203.T,2025-12-02,nan,nan,nan,nan,0\n\
             7203.T,2025-12-03,\"1,050\",1100,1000,1080,\n",
        );

        let bars = load_daily_bars(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[1].open, 1050.0);
        assert_eq!(bars[1].volume, 0.0);
    }

    #[test]
    fn test_load_intraday_bars_merges_files_later_wins() {
        let a = temp_csv(
            "a_5m.csv",
            "ticker,datetime,open,high,low,close,volume\n\
             7203.T,2025-12-01T00:00:00Z,100,101,99,100.5,10\n\
             7203.T,2025-12-01T00:05:00Z,100.5,102,100,nan,10\n",
        );
        let b = temp_csv(
            "b_5m.csv",
            "ticker,datetime,open,high,low,close,volume\n\
             7203.T,2025-12-01 09:00:00+09:00,200,201,199,200.5,10\n",
        );
        let missing = PathBuf::from("/nonexistent/trend_backtest_5m.csv");

        let bars = load_intraday_bars(&[a.clone(), missing, b.clone()]).unwrap();
        std::fs::remove_file(&a).ok();
        std::fs::remove_file(&b).ok();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].ts, ts(2025, 12, 1, 9, 0));
        assert_eq!(bars[0].open, 200.0);
        assert_eq!(bars[1].close, None);
    }

    #[test]
    fn test_load_intraday_bars_skips_rows_with_bad_timestamp() {
        let path = temp_csv(
            "corrupt_5m.csv",
            "ticker,datetime,open,high,low,close,volume\n\
             7203.T,2025-12-01T00:00:00Z,100,101,99,100.5,10\n\
             7203.T,not-a-time,100.5,102,100,101,10\n\
             7203.T,2025-12-01T00:10:00Z,101,102,100,101.5,10\n",
        );

        let bars = load_intraday_bars(&[path.clone()]).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].ts, ts(2025, 12, 1, 9, 0));
        assert_eq!(bars[1].ts, ts(2025, 12, 1, 9, 10));
        assert_eq!(bars[1].close, Some(101.5));
    }

    #[test]
    fn test_load_intraday_bars_errors_when_nothing_found() {
        let missing = PathBuf::from("/nonexistent/trend_backtest_none.csv");
        assert!(load_intraday_bars(&[missing]).is_err());
    }
}

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use crate::calendar::TradingCalendar;
use crate::data::bars::parse_date;
use crate::data::parse::{parse_number, read_csv_bytes};

#[derive(Debug, Deserialize)]
struct SelectionRow {
    ticker: String,
    #[serde(default)]
    stock_name: String,
    #[serde(alias = "date")]
    selection_date: String,
    #[serde(default)]
    backtest_date: String,
    #[serde(default)]
    grok_rank: String,
    #[serde(default)]
    total_stocks: String,
    #[serde(default)]
    selection_score: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    selected_time: String,
}

/// One row of the grok_trending table: a stock picked for the next session.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub ticker: String,
    pub stock_name: String,
    pub selection_date: NaiveDate,
    /// Session the pick is traded in.
    pub backtest_date: NaiveDate,
    /// 1 = strongest pick.
    pub grok_rank: Option<u32>,
    /// Picks made that day.
    pub total_stocks: Option<u32>,
    pub selection_score: Option<f64>,
    pub reason: String,
    pub selected_time: String,
}

fn parse_count(raw: &str) -> Option<u32> {
    parse_number(raw)
        .filter(|v| *v >= 0.0 && v.fract() == 0.0)
        .map(|v| v as u32)
}

pub fn load_selections(input: &Path, calendar: &TradingCalendar) -> Result<Vec<Selection>> {
    let mut rdr = read_csv_bytes(input)?;
    let mut out = Vec::new();

    for result in rdr.deserialize::<SelectionRow>() {
        let row: SelectionRow = result.with_context(|| "failed to deserialize selection row")?;
        let Some(selection_date) = parse_date(&row.selection_date) else {
            warn!(ticker = %row.ticker, raw = %row.selection_date, "selection without a valid date");
            continue;
        };
        let backtest_date = match parse_date(&row.backtest_date) {
            Some(d) => d,
            None => calendar
                .next_trading_day(selection_date)
                .with_context(|| format!("no trading day after {selection_date}"))?,
        };
        out.push(Selection {
            ticker: row.ticker,
            stock_name: row.stock_name,
            selection_date,
            backtest_date,
            grok_rank: parse_count(&row.grok_rank),
            total_stocks: parse_count(&row.total_stocks),
            selection_score: parse_number(&row.selection_score),
            reason: row.reason,
            selected_time: row.selected_time,
        });
    }

    fill_total_stocks(&mut out);
    Ok(out)
}

/// Picks without an explicit `total_stocks` get the size of their day's list.
pub fn fill_total_stocks(selections: &mut [Selection]) {
    let mut per_day: HashMap<NaiveDate, u32> = HashMap::new();
    for s in selections.iter() {
        *per_day.entry(s.selection_date).or_default() += 1;
    }
    for s in selections.iter_mut() {
        if s.total_stocks.is_none() {
            s.total_stocks = per_day.get(&s.selection_date).copied();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    #[test]
    fn test_load_selections_derives_backtest_date_and_totals() {
        let mut path = std::env::temp_dir();
        path.push(format!("trend_backtest_sel_{}.csv", std::process::id()));
        std::fs::write(
            &path,
            "ticker,stock_name,selection_date,backtest_date,grok_rank,selection_score,reason\n\
             7203.T,Toyota,2025-12-05,,1,92.5,volume spike\n\
             6758.T,Sony,2025-12-05,,2.0,,\n\
             9984.T,SoftBank,2025-12-08,2025-12-10,1,80,\n\
             bad.T,Bad,not-a-date,,1,1,\n",
        )
        .unwrap();

        let sels = load_selections(&path, &TradingCalendar::default()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(sels.len(), 3);
        // Friday pick trades Monday
        assert_eq!(sels[0].backtest_date, d(12, 8));
        assert_eq!(sels[0].selection_score, Some(92.5));
        assert_eq!(sels[1].grok_rank, Some(2));
        assert_eq!(sels[1].selection_score, None);
        assert_eq!(sels[0].total_stocks, Some(2));
        // explicit backtest date wins
        assert_eq!(sels[2].backtest_date, d(12, 10));
        assert_eq!(sels[2].total_stocks, Some(1));
    }

    #[test]
    fn test_parse_count_rejects_fractions_and_negatives() {
        assert_eq!(parse_count("3"), Some(3));
        assert_eq!(parse_count("3.0"), Some(3));
        assert_eq!(parse_count("2.5"), None);
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count(""), None);
    }
}

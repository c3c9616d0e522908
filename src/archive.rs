use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::parse::read_csv_bytes;
use crate::indicators::TechnicalSnapshot;
use crate::price_limit::LimitState;
use crate::selection::Selection;

/// One selection and everything that happened to it.
///
/// Profit columns are yen per 100 shares. `profit_per_100_shares_*` are long
/// basis, `seg_*` are short basis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub ticker: String,
    pub stock_name: String,
    pub selection_date: Option<NaiveDate>,
    pub backtest_date: Option<NaiveDate>,
    pub grok_rank: Option<u32>,
    pub total_stocks: Option<u32>,
    pub selection_score: Option<f64>,
    pub reason: String,
    pub selected_time: String,

    pub prev_day_close: Option<f64>,
    pub prev_day_change_pct: Option<f64>,
    pub rsi_14d: Option<f64>,
    pub volume_change_20d: Option<f64>,
    pub sma_5d: Option<f64>,
    pub price_vs_sma5_pct: Option<f64>,
    pub atr14_pct: Option<f64>,

    pub buy_price: Option<f64>,
    pub sell_price: Option<f64>,
    pub sell_time: Option<String>,
    pub daily_close: Option<f64>,
    pub daily_high: Option<f64>,
    pub daily_low: Option<f64>,
    pub split_adjustment: Option<f64>,
    pub price_limit: Option<LimitState>,

    pub phase1_return: Option<f64>,
    pub phase1_win: Option<bool>,
    pub phase2_return: Option<f64>,
    pub phase2_win: Option<bool>,

    pub profit_per_100_shares_phase1: Option<f64>,
    pub profit_per_100_shares_phase2: Option<f64>,
    pub profit_per_100_shares_morning_early: Option<f64>,
    pub profit_per_100_shares_afternoon_early: Option<f64>,

    pub seg_0930: Option<f64>,
    pub seg_1000: Option<f64>,
    pub seg_1030: Option<f64>,
    pub seg_1100: Option<f64>,
    pub seg_1130: Option<f64>,
    pub seg_1300: Option<f64>,
    pub seg_1330: Option<f64>,
    pub seg_1400: Option<f64>,
    pub seg_1430: Option<f64>,
    pub seg_1500: Option<f64>,
    pub seg_1530: Option<f64>,
}

impl ArchiveRecord {
    pub fn from_selection(sel: &Selection) -> Self {
        Self {
            ticker: sel.ticker.clone(),
            stock_name: sel.stock_name.clone(),
            selection_date: Some(sel.selection_date),
            backtest_date: Some(sel.backtest_date),
            grok_rank: sel.grok_rank,
            total_stocks: sel.total_stocks,
            selection_score: sel.selection_score,
            reason: sel.reason.clone(),
            selected_time: sel.selected_time.clone(),
            ..Self::default()
        }
    }

    pub fn apply_snapshot(&mut self, snap: &TechnicalSnapshot) {
        self.prev_day_close = snap.prev_day_close;
        self.prev_day_change_pct = snap.prev_day_change_pct;
        self.rsi_14d = snap.rsi_14d;
        self.volume_change_20d = snap.volume_change_20d;
        self.sma_5d = snap.sma_5d;
        self.price_vs_sma5_pct = snap.price_vs_sma5_pct;
        self.atr14_pct = snap.atr14_pct;
    }

    pub fn snapshot(&self) -> TechnicalSnapshot {
        TechnicalSnapshot {
            prev_day_close: self.prev_day_close,
            prev_day_change_pct: self.prev_day_change_pct,
            rsi_14d: self.rsi_14d,
            volume_change_20d: self.volume_change_20d,
            sma_5d: self.sma_5d,
            price_vs_sma5_pct: self.price_vs_sma5_pct,
            atr14_pct: self.atr14_pct,
        }
    }
}

/// Load the archive; a missing file is an empty archive.
pub fn load_archive(path: &Path) -> Result<Vec<ArchiveRecord>> {
    if !path.exists() {
        info!(file = ?path, "no archive yet, starting empty");
        return Ok(Vec::new());
    }
    let mut rdr = read_csv_bytes(path)?;
    rdr.deserialize::<ArchiveRecord>()
        .map(|r| r.with_context(|| format!("failed to deserialize archive row in {:?}", path)))
        .collect()
}

pub fn save_archive(path: &Path, records: &[ArchiveRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {:?}", parent))?;
    }
    let mut wtr = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("failed to create archive file {:?}", path))?;
    for rec in records {
        wtr.serialize(rec)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Replace every row of `date` with `rows`. Re-running a date is idempotent.
pub fn upsert_date(
    archive: Vec<ArchiveRecord>,
    date: NaiveDate,
    rows: Vec<ArchiveRecord>,
) -> Vec<ArchiveRecord> {
    let mut merged: Vec<ArchiveRecord> = archive
        .into_iter()
        .filter(|r| r.backtest_date != Some(date))
        .collect();
    merged.extend(rows);
    sort_archive(&mut merged);
    merged
}

pub fn sort_archive(records: &mut [ArchiveRecord]) {
    records.sort_by(|a, b| {
        a.backtest_date
            .cmp(&b.backtest_date)
            .then(
                a.grok_rank
                    .unwrap_or(u32::MAX)
                    .cmp(&b.grok_rank.unwrap_or(u32::MAX)),
            )
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
}

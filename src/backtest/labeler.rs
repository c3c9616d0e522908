use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, warn};

use crate::archive::ArchiveRecord;
use crate::data::{IntradayBar, PriceBook};
use crate::indicators::TechnicalSnapshot;
use crate::price_limit::limit_state;
use crate::selection::Selection;

use super::exit::{Direction, ExitRule, profit_per_100, split_adjustment};
use super::segments::{PHASE1_EXIT, ProfitColumn, TimeSegment};

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("failed to write label log: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode label record: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait LabelLogger: Sync {
    fn log(&self, record: &ArchiveRecord) -> Result<(), LabelError>;
}

/// Appends each labeled record as one JSON line.
pub struct NdjsonLogger {
    pub path: PathBuf,
}

impl NdjsonLogger {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl LabelLogger for NdjsonLogger {
    fn log(&self, record: &ArchiveRecord) -> Result<(), LabelError> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(record)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub struct NoopLogger;

impl LabelLogger for NoopLogger {
    fn log(&self, _record: &ArchiveRecord) -> Result<(), LabelError> {
        Ok(())
    }
}

/// Turns selections into archive rows by reading what the market did.
pub struct Labeler<L> {
    logger: L,
}

impl Labeler<NoopLogger> {
    pub fn new() -> Self {
        Self { logger: NoopLogger }
    }
}

impl Default for Labeler<NoopLogger> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: LabelLogger> Labeler<L> {
    pub fn with_logger(logger: L) -> Self {
        Self { logger }
    }

    pub fn label(&self, sel: &Selection, book: &PriceBook) -> Result<ArchiveRecord, LabelError> {
        let mut rec = ArchiveRecord::from_selection(sel);
        let date = sel.backtest_date;

        let history = book.daily_before(&sel.ticker, date);
        rec.apply_snapshot(&TechnicalSnapshot::from_history(history));

        let Some(day) = book.daily(&sel.ticker, date) else {
            warn!(ticker = %sel.ticker, %date, "no daily bar on backtest date");
            self.logger.log(&rec)?;
            return Ok(rec);
        };
        rec.daily_close = Some(day.close);
        rec.daily_high = Some(day.high);
        rec.daily_low = Some(day.low);
        rec.price_limit = rec.prev_day_close.and_then(|prev| limit_state(prev, day));

        let buy = day.open;
        if buy > 0.0 {
            rec.buy_price = Some(buy);

            let phase2_return = (day.close - buy) / buy;
            rec.phase2_return = Some(phase2_return);
            rec.phase2_win = Some(phase2_return > 0.0);

            let bars = book.intraday(&sel.ticker, date);
            if bars.is_empty() {
                debug!(ticker = %sel.ticker, %date, "no 5-minute bars");
            } else {
                let split = split_adjustment(bars, Some(day.close));
                rec.split_adjustment = Some(split);
                if let Some(fill) = PHASE1_EXIT.resolve(bars, Some(day.close)) {
                    let sell = fill.price * split;
                    let phase1_return = (sell - buy) / buy;
                    rec.sell_price = Some(sell);
                    rec.sell_time = fill.at.map(|t| t.format("%H:%M").to_string());
                    rec.phase1_return = Some(phase1_return);
                    rec.phase1_win = Some(phase1_return > 0.0);
                }
            }
            apply_segments(&mut rec, buy, bars, Some(day.close));
        }

        self.logger.log(&rec)?;
        Ok(rec)
    }

    pub fn label_all(
        &self,
        selections: &[Selection],
        book: &PriceBook,
    ) -> Result<Vec<ArchiveRecord>, LabelError> {
        selections.iter().map(|s| self.label(s, book)).collect()
    }
}

fn exit_price(rule: ExitRule, bars: &[IntradayBar], daily_close: Option<f64>, split: f64) -> Option<f64> {
    let fill = rule.resolve(bars, daily_close)?;
    Some(if rule.is_intraday() {
        fill.price * split
    } else {
        fill.price
    })
}

/// Writes the four-segment (long) and eleven-segment (short) profit columns.
fn apply_segments(rec: &mut ArchiveRecord, buy: f64, bars: &[IntradayBar], daily_close: Option<f64>) {
    let split = split_adjustment(bars, daily_close);

    for col in ProfitColumn::FOUR_SEGMENTS {
        *col.slot(rec) = exit_price(col.exit_rule(), bars, daily_close, split)
            .map(|p| profit_per_100(buy, p, Direction::Long));
    }
    for seg in TimeSegment::ALL {
        *seg.slot(rec) = exit_price(seg.exit_rule(), bars, daily_close, split)
            .map(|p| profit_per_100(buy, p, Direction::Short));
    }
}

/// Rewrites the columns a row can still back without its 5-minute bars: the
/// phase1 exit (`sell_price`) and the daily close. The other intraday columns
/// keep their stored values. Returns false when neither price is known.
fn apply_stored_exits(rec: &mut ArchiveRecord, buy: f64, daily_close: Option<f64>) -> bool {
    let exits = [
        (rec.sell_price, ProfitColumn::Phase1, TimeSegment::S1130),
        (daily_close, ProfitColumn::Phase2, TimeSegment::S1530),
    ];
    let mut wrote = false;
    for (price, col, seg) in exits {
        let Some(price) = price else {
            continue;
        };
        *col.slot(rec) = Some(profit_per_100(buy, price, Direction::Long));
        *seg.slot(rec) = Some(profit_per_100(buy, price, Direction::Short));
        wrote = true;
    }
    wrote
}

/// Recompute the segment columns of existing rows from fresh price data.
/// Rows without a backtest date or buy price are left untouched. A row whose
/// 5-minute bars are no longer in the book only gets its phase1 and close
/// columns refreshed. Returns how many rows were rewritten.
pub fn fill_segments(records: &mut [ArchiveRecord], book: &PriceBook) -> usize {
    let mut filled = 0;
    for rec in records.iter_mut() {
        let (Some(date), Some(buy)) = (rec.backtest_date, rec.buy_price) else {
            continue;
        };
        if buy <= 0.0 {
            continue;
        }
        let daily_close = book
            .daily(&rec.ticker, date)
            .map(|d| d.close)
            .or(rec.daily_close);
        let bars = book.intraday(&rec.ticker, date);
        if bars.is_empty() {
            if apply_stored_exits(rec, buy, daily_close) {
                debug!(ticker = %rec.ticker, %date, "no intraday bars, refreshed stored exits only");
                filled += 1;
            }
            continue;
        }
        apply_segments(rec, buy, bars, daily_close);
        filled += 1;
    }
    filled
}

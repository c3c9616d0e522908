use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::archive::ArchiveRecord;
use crate::data::{DailyBar, PriceBook};
use crate::indicators::TechnicalSnapshot;

use super::exit::{Direction, profit_per_100};
use super::scoring::{Action, ScoringInput, ScoringModel};
use super::segments::ProfitColumn;
use super::stats::SegmentStats;

/// One scored pick and what acting on it would have earned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredTrade {
    pub ticker: String,
    pub date: Option<NaiveDate>,
    pub action: Action,
    pub score_buy: i32,
    pub score_sell: i32,
    /// Yen per 100 shares on the side taken; `None` for HOLD or missing prices.
    pub profit: Option<f64>,
    pub price_filtered: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelEvaluation {
    pub model: String,
    pub source: String,
    pub decisions: usize,
    pub holds: usize,
    pub price_filtered: usize,
    pub buy: SegmentStats,
    pub sell: SegmentStats,
    pub combined: SegmentStats,
}

impl ModelEvaluation {
    pub fn from_trades(model: &str, source: impl Into<String>, trades: &[ScoredTrade]) -> Self {
        Self {
            model: model.to_string(),
            source: source.into(),
            decisions: trades.len(),
            holds: trades.iter().filter(|t| t.action == Action::Hold).count(),
            price_filtered: trades.iter().filter(|t| t.price_filtered).count(),
            buy: SegmentStats::from_outcomes("BUY", &outcomes(trades, |a| a == Action::Buy)),
            sell: SegmentStats::from_outcomes("SELL", &outcomes(trades, |a| a == Action::Sell)),
            combined: SegmentStats::from_outcomes(
                "BUY+SELL",
                &outcomes(trades, |a| a != Action::Hold),
            ),
        }
    }
}

fn outcomes(
    trades: &[ScoredTrade],
    keep: impl Fn(Action) -> bool,
) -> Vec<(Option<NaiveDate>, Option<f64>)> {
    trades
        .iter()
        .filter(|t| keep(t.action))
        .map(|t| (t.date, t.profit))
        .collect()
}

fn realized(action: Action, long_profit: Option<f64>) -> Option<f64> {
    match action {
        Action::Buy => long_profit,
        Action::Sell => long_profit.map(|p| -p),
        Action::Hold => None,
    }
}

/// Score every archive row and book the chosen column's outcome.
pub fn evaluate_archive(
    model: &dyn ScoringModel,
    records: &[ArchiveRecord],
    column: ProfitColumn,
) -> ModelEvaluation {
    let trades: Vec<ScoredTrade> = records
        .iter()
        .map(|rec| {
            let d = model.score(&ScoringInput::from_record(rec));
            ScoredTrade {
                ticker: rec.ticker.clone(),
                date: rec.backtest_date,
                action: d.action,
                score_buy: d.score_buy,
                score_sell: d.score_sell,
                profit: realized(d.action, column.long_profit(rec)),
                price_filtered: d.price_filtered,
            }
        })
        .collect();

    ModelEvaluation::from_trades(model.name(), format!("archive {}", column.column()), &trades)
}

pub fn compare_models(
    models: &[Box<dyn ScoringModel>],
    records: &[ArchiveRecord],
    column: ProfitColumn,
) -> Vec<ModelEvaluation> {
    models
        .iter()
        .map(|m| evaluate_archive(m.as_ref(), records, column))
        .collect()
}

/// The evaluation with the highest combined profit.
pub fn best_model(evals: &[ModelEvaluation]) -> Option<&ModelEvaluation> {
    evals
        .iter()
        .filter(|e| e.combined.valid > 0)
        .max_by(|a, b| a.combined.total_profit.total_cmp(&b.combined.total_profit))
}

/// Replays a model over plain daily history: score after each close, trade
/// the next session open to close.
#[derive(Debug, Clone, Copy)]
pub struct StaticBacktester {
    min_history: usize,
}

impl StaticBacktester {
    pub const DEFAULT_MIN_HISTORY: usize = 30;

    pub fn new(min_history: usize) -> Self {
        Self {
            min_history: min_history.max(1),
        }
    }

    pub fn run_ticker(&self, model: &dyn ScoringModel, bars: &[DailyBar]) -> Vec<ScoredTrade> {
        if bars.len() <= self.min_history {
            return Vec::new();
        }
        (self.min_history - 1..bars.len() - 1)
            .map(|i| {
                let snap = TechnicalSnapshot::from_history(&bars[..=i]);
                let d = model.score(&ScoringInput::from_snapshot(&snap));
                let next = &bars[i + 1];
                let long = (next.open > 0.0)
                    .then(|| profit_per_100(next.open, next.close, Direction::Long));
                ScoredTrade {
                    ticker: next.ticker.clone(),
                    date: Some(next.date),
                    action: d.action,
                    score_buy: d.score_buy,
                    score_sell: d.score_sell,
                    profit: realized(d.action, long),
                    price_filtered: d.price_filtered,
                }
            })
            .collect()
    }

    /// Tickers run in parallel. An empty `tickers` means every ticker in the book.
    pub fn run(
        &self,
        model: &dyn ScoringModel,
        book: &PriceBook,
        tickers: &[String],
    ) -> ModelEvaluation {
        let universe: Vec<&str> = if tickers.is_empty() {
            book.tickers()
        } else {
            tickers.iter().map(String::as_str).collect()
        };

        let mut trades: Vec<ScoredTrade> = universe
            .par_iter()
            .flat_map_iter(|t| self.run_ticker(model, book.daily_history(t)))
            .collect();
        trades.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.ticker.cmp(&b.ticker)));

        debug!(
            model = model.name(),
            tickers = universe.len(),
            trades = trades.len(),
            "static backtest done"
        );
        ModelEvaluation::from_trades(model.name(), "daily open-to-close", &trades)
    }

    pub fn compare(
        &self,
        models: &[Box<dyn ScoringModel>],
        book: &PriceBook,
        tickers: &[String],
    ) -> Vec<ModelEvaluation> {
        models
            .iter()
            .map(|m| self.run(m.as_ref(), book, tickers))
            .collect()
    }
}

impl Default for StaticBacktester {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_HISTORY)
    }
}

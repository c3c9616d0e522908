use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use tracing::{info, warn};

use trend_backtest::{
    archive::{ArchiveRecord, load_archive, save_archive, upsert_date},
    backtest::{Labeler, NdjsonLogger, stats::summarize_all},
    calendar::TradingCalendar,
    config::{self, LabelConfig},
    data::PriceBook,
    logging,
    output::print_segment_table,
    selection::load_selections,
};

/// Label selections with what the market did and merge them into the archive.
#[derive(Debug, Parser)]
struct Args {
    /// config-file path
    #[arg(long)]
    config: PathBuf,
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();
    let config: LabelConfig = config::load(&args.config)?;

    let calendar = TradingCalendar::new(config.holidays.iter().copied());
    let mut selections = load_selections(&config.selections, &calendar)
        .with_context(|| format!("failed to load selections from {:?}", config.selections))?;
    if let Some(date) = config.target_date {
        selections.retain(|s| s.backtest_date == date);
    }
    if selections.is_empty() {
        println!("No selections to label.");
        return Ok(());
    }
    info!(selections = selections.len(), "selections loaded");

    let book = PriceBook::load(&config.prices.daily_prices, &config.prices.intraday_prices)?;

    let records = match &config.record_log {
        Some(path) => Labeler::with_logger(NdjsonLogger::new(path.clone()))
            .label_all(&selections, &book)?,
        None => Labeler::new().label_all(&selections, &book)?,
    };

    let mut by_date: BTreeMap<NaiveDate, Vec<ArchiveRecord>> = BTreeMap::new();
    for rec in records.iter().cloned() {
        match rec.backtest_date {
            Some(date) => by_date.entry(date).or_default().push(rec),
            None => warn!(ticker = %rec.ticker, "labeled record without backtest date"),
        }
    }

    let mut archive = load_archive(&config.archive)?;
    let before = archive.len();
    for (date, rows) in by_date {
        println!("{date}: {} rows", rows.len());
        archive = upsert_date(archive, date, rows);
    }
    save_archive(&config.archive, &archive)?;

    let unpriced = records.iter().filter(|r| r.buy_price.is_none()).count();
    println!(
        "Labeled {} selections ({} without an entry price). Archive {} -> {} rows.",
        records.len(),
        unpriced,
        before,
        archive.len()
    );
    println!();
    print_segment_table("Labeled selections", &summarize_all(&records));

    Ok(())
}

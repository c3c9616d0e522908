use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use trend_backtest::{
    archive::{load_archive, save_archive},
    backtest::{fill_segments, stats::summarize_all},
    config::{self, FillConfig},
    data::PriceBook,
    logging,
    output::print_segment_table,
};

/// Recompute the four- and eleven-segment profit columns of an existing archive.
#[derive(Debug, Parser)]
struct Args {
    /// config-file path
    #[arg(long)]
    config: PathBuf,
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();
    let config: FillConfig = config::load(&args.config)?;

    let mut archive = load_archive(&config.archive)?;
    if archive.is_empty() {
        println!("Archive {:?} is empty.", config.archive);
        return Ok(());
    }

    let book = PriceBook::load(&config.prices.daily_prices, &config.prices.intraday_prices)?;
    let filled = fill_segments(&mut archive, &book);

    let output = config.output.as_ref().unwrap_or(&config.archive);
    save_archive(output, &archive)?;

    println!(
        "Recomputed segments for {filled} of {} rows -> {:?}",
        archive.len(),
        output
    );
    println!();
    print_segment_table("All segments", &summarize_all(&archive));

    Ok(())
}

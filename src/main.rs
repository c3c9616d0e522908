use anyhow::{Context, Result};
use clap::Parser;

use std::path::PathBuf;

use trend_backtest::{
    backtest::{ScoringInput, all_models},
    data::{PriceBook, load_daily_bars},
    indicators::TechnicalSnapshot,
    logging,
    output::{print_decision, print_snapshot},
    price_limit::{max_cost_100, upper_limit_price},
};

#[derive(Debug, Parser)]
struct Args {
    /// Path to the daily OHLCV CSV (ticker,date,Open,High,Low,Close,Volume)
    #[arg(long)]
    input: PathBuf,

    /// Ticker to score, e.g. 7203.T
    #[arg(long)]
    ticker: String,

    /// The pick's rank in today's selection list
    #[arg(long)]
    rank: Option<u32>,

    /// Size of today's selection list
    #[arg(long)]
    total: Option<u32>,
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let daily = load_daily_bars(&args.input)
        .with_context(|| format!("failed to load daily prices from {:?}", args.input))?;
    let book = PriceBook::new(daily, Vec::new());

    let history = book.daily_history(&args.ticker);
    let Some(last) = history.last() else {
        println!("No daily bars for {} in {:?}.", args.ticker, args.input);
        return Ok(());
    };
    println!("Loaded {} daily bars for {}.", history.len(), args.ticker);
    println!();

    let snap = TechnicalSnapshot::from_history(history);
    print_snapshot(&args.ticker, last.date, &snap);
    println!(
        "Next-session upper limit: {:.0} (100 shares cost at most {:.0} yen)",
        upper_limit_price(last.close),
        max_cost_100(last.close)
    );
    println!();

    let input = ScoringInput {
        grok_rank: args.rank,
        total_stocks: args.total,
        ..ScoringInput::from_snapshot(&snap)
    };
    for model in all_models() {
        print_decision(model.name(), &model.score(&input));
    }

    Ok(())
}

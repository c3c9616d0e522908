use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use tracing::info;

use trend_backtest::{
    archive::load_archive,
    backtest::{
        ModelEvaluation, ProfitColumn, StaticBacktester, all_models, best_model, compare_models,
    },
    config::{self, ScoreConfig},
    data::{PriceBook, load_daily_bars},
    logging,
    output::print_evaluation,
    report::{ReportSection, write_html_report},
};

/// Compare the scoring models on the archive and on plain daily history.
#[derive(Debug, Parser)]
struct Args {
    /// config-file path
    #[arg(long)]
    config: PathBuf,
}

fn print_best(heading: &str, evals: &[ModelEvaluation]) {
    match best_model(evals) {
        Some(best) => println!(
            "Best on {heading}: {} (total {:.0} yen over {} trades, win {:.1}%)",
            best.model,
            best.combined.total_profit,
            best.combined.valid,
            best.combined.win_rate * 100.0
        ),
        None => println!("No model traded on {heading}."),
    }
    println!();
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();
    let config: ScoreConfig = config::load(&args.config)?;

    if config.archive.is_none() && config.daily_prices.is_none() {
        bail!("set `archive`, `daily_prices` or both");
    }

    let column: ProfitColumn = config.exit_column.parse().map_err(|e: String| anyhow!(e))?;
    let models = all_models();
    let mut evaluations: Vec<ModelEvaluation> = Vec::new();

    if let Some(path) = &config.archive {
        let mut archive = load_archive(path)?;
        if let Some(since) = config.since {
            archive.retain(|r| r.backtest_date.is_some_and(|d| d >= since));
        }
        info!(rows = archive.len(), column = %column, "evaluating models on archive");

        let evals = compare_models(&models, &archive, column);
        for e in &evals {
            print_evaluation(e);
        }
        print_best(&format!("archive ({column})"), &evals);
        evaluations.extend(evals);
    }

    if let Some(path) = &config.daily_prices {
        let mut daily = load_daily_bars(path)
            .with_context(|| format!("failed to load daily prices from {:?}", path))?;
        if let Some(since) = config.since {
            daily.retain(|b| b.date >= since);
        }
        let book = PriceBook::new(daily, Vec::new());
        info!(
            bars = book.daily_len(),
            min_history = config.min_history,
            "running static backtests"
        );

        let evals =
            StaticBacktester::new(config.min_history).compare(&models, &book, &config.tickers);
        for e in &evals {
            print_evaluation(e);
        }
        print_best("daily history", &evals);
        evaluations.extend(evals);
    }

    if let Some(path) = &config.html_output {
        let sections: Vec<ReportSection> = evaluations
            .iter()
            .map(|e| {
                ReportSection::new(
                    format!("{} on {}", e.model, e.source),
                    vec![e.buy.clone(), e.sell.clone(), e.combined.clone()],
                )
                .with_note(format!(
                    "{} decisions, {} holds, {} price-filtered",
                    e.decisions, e.holds, e.price_filtered
                ))
            })
            .collect();
        write_html_report(path, "Scoring model backtest", &sections)?;
        println!("HTML report: {:?}", path);
    }

    Ok(())
}

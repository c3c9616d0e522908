use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;

use trend_backtest::{
    archive::load_archive,
    backtest::{
        ProfitColumn,
        stats::{SegmentStats, best_by_mean, by_price_limit, by_rank_bucket, by_weekday, summarize_all},
    },
    config::{self, ReportConfig},
    logging,
    output::print_segment_table,
    report::{ReportSection, write_html_report, write_json_summary},
};

/// Segment statistics of the archive as console tables, HTML and JSON.
#[derive(Debug, Parser)]
struct Args {
    /// config-file path
    #[arg(long)]
    config: PathBuf,
}

#[derive(Serialize)]
struct Summary<'a> {
    title: &'a str,
    rows: usize,
    best: Option<&'a SegmentStats>,
    sections: &'a [ReportSection],
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();
    let config: ReportConfig = config::load(&args.config)?;

    let mut archive = load_archive(&config.archive)?;
    if let Some(since) = config.since {
        archive.retain(|r| r.backtest_date.is_some_and(|d| d >= since));
    }
    if archive.is_empty() {
        println!("No archive rows to report.");
        return Ok(());
    }

    let all = summarize_all(&archive);
    let best = best_by_mean(&all).cloned();

    let mut sections = vec![
        ReportSection::new("All exits", all)
            .with_note("yen per 100 shares; 4-segment columns long, 11-segment columns short"),
    ];
    for column in [ProfitColumn::Phase1, ProfitColumn::Phase2] {
        sections.push(ReportSection::new(
            format!("{} by weekday", column.label()),
            by_weekday(&archive, column),
        ));
        sections.push(ReportSection::new(
            format!("{} by rank", column.label()),
            by_rank_bucket(&archive, column),
        ));
        sections.push(ReportSection::new(
            format!("{} by price limit", column.label()),
            by_price_limit(&archive, column),
        ));
    }

    println!("{} ({} rows)", config.title, archive.len());
    println!();
    for section in &sections {
        print_segment_table(&section.heading, &section.rows);
    }
    if let Some(best) = &best {
        println!(
            "Best exit by mean: {} ({:.1} yen, win {:.1}%)",
            best.label,
            best.mean_profit,
            best.win_rate * 100.0
        );
    }

    if let Some(path) = &config.html_output {
        write_html_report(path, &config.title, &sections)?;
        println!("HTML report: {:?}", path);
    }
    if let Some(path) = &config.json_output {
        let summary = Summary {
            title: &config.title,
            rows: archive.len(),
            best: best.as_ref(),
            sections: &sections,
        };
        write_json_summary(path, &summary)?;
        println!("JSON summary: {:?}", path);
    }

    Ok(())
}

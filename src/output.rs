use chrono::NaiveDate;

use crate::backtest::{ModelEvaluation, ScoreDecision, SegmentStats};
use crate::indicators::TechnicalSnapshot;

fn opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(v) => format!("{v:.decimals$}"),
        None => "-".to_string(),
    }
}

pub fn print_segment_table(title: &str, rows: &[SegmentStats]) {
    println!("=== {title} ===");
    println!(
        "{:<24} {:>6} {:>6} {:>8} {:>12} {:>10} {:>10}",
        "segment", "valid", "wins", "win%", "total", "mean", "max dd"
    );
    for s in rows {
        println!(
            "{:<24} {:>6} {:>6} {:>7.2}% {:>12.0} {:>10.1} {:>10.0}",
            s.label,
            s.valid,
            s.wins,
            s.win_rate * 100.0,
            s.total_profit,
            s.mean_profit,
            s.max_drawdown
        );
    }
    println!();
}

pub fn print_evaluation(eval: &ModelEvaluation) {
    println!("=== {} ({}) ===", eval.model, eval.source);
    println!("Decisions:        {}", eval.decisions);
    println!("Holds:            {}", eval.holds);
    println!("Price-filtered:   {}", eval.price_filtered);
    for s in [&eval.buy, &eval.sell, &eval.combined] {
        println!(
            "{:<9} trades {:>5}  win {:>6.2}%  total {:>12.0}  mean {:>9.1}  dd {:>10.0}",
            s.label,
            s.valid,
            s.win_rate * 100.0,
            s.total_profit,
            s.mean_profit,
            s.max_drawdown
        );
    }
    println!();
}

pub fn print_snapshot(ticker: &str, as_of: NaiveDate, snap: &TechnicalSnapshot) {
    println!("Ticker:                  {ticker}");
    println!("As of close:             {as_of}");
    println!("Close:                   {}", opt(snap.prev_day_close, 1));
    println!("Change vs prev close:    {}%", opt(snap.prev_day_change_pct, 2));
    println!("RSI(14):                 {}", opt(snap.rsi_14d, 1));
    println!("Volume / 20d average:    {}", opt(snap.volume_change_20d, 2));
    println!("SMA(5):                  {}", opt(snap.sma_5d, 1));
    println!("Price vs SMA(5):         {}%", opt(snap.price_vs_sma5_pct, 2));
    println!("ATR(14):                 {}%", opt(snap.atr14_pct, 2));
}

pub fn print_decision(model: &str, d: &ScoreDecision) {
    println!(
        "{model:<8} {:<4}  buy {:>4}  sell {:>4}  {}",
        d.action,
        d.score_buy,
        d.score_sell,
        d.reasons.join(" / ")
    );
}

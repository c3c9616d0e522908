pub mod archive;
pub mod backtest;
pub mod calendar;
pub mod config;
pub mod data;
pub mod indicators;
pub mod logging;
pub mod output;
pub mod price_limit;
pub mod report;
pub mod selection;

pub mod bars;
pub mod book;
pub mod parse;

pub use bars::{DailyBar, IntradayBar, load_daily_bars, load_intraday_bars};
pub use book::PriceBook;
pub use parse::{parse_number, parse_percent};

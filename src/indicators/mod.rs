pub mod atr;
pub mod rsi;
pub mod sma;
pub mod snapshot;
pub mod volume;

pub use atr::{atr, atr_percent, true_range};
pub use rsi::rsi;
pub use sma::{deviation_from_sma_pct, simple_moving_average};
pub use snapshot::TechnicalSnapshot;
pub use volume::volume_ratio;

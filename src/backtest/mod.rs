pub mod exit;
pub mod heuristic;
pub mod labeler;
pub mod scoring;
pub mod segments;
pub mod stats;

pub use exit::{Direction, ExitFill, ExitRule, profit_per_100, split_adjustment};
pub use heuristic::{
    ModelEvaluation, ScoredTrade, StaticBacktester, best_model, compare_models, evaluate_archive,
};
pub use labeler::{LabelError, LabelLogger, Labeler, NdjsonLogger, NoopLogger, fill_segments};
pub use scoring::{Action, ScoreDecision, ScoringInput, ScoringModel, all_models, model_by_name};
pub use segments::{ProfitColumn, TimeSegment};
pub use stats::{SegmentStats, summarize, summarize_all};

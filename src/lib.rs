// Core modules
pub mod error;
pub mod prediction;
pub mod combination_finder;
pub mod rollover_ledger;
pub mod challenge;
pub mod accumulator_builder;
pub mod config;

// Re-exports
pub use error::{EngineError, EngineResult};
pub use prediction::{validate_all, PredictionCandidate, PredictionStatus};
pub use combination_finder::{find_combinations, size_cap, Combination, CombinationFinder};
pub use rollover_ledger::{
    build_ledger, LedgerEntry, LedgerStatistics, RolloverDay, RolloverProgress,
};
pub use challenge::{DayBucketer, RolloverChallenge};
pub use accumulator_builder::{AccumulatorBuilder, CandidateFilters, CategoryResult, OddsCategory};
pub use crate::config::AppConfig;

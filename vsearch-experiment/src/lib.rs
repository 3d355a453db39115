pub mod breaks;
pub mod config;
pub mod error;
pub mod generator;
pub mod ordering;
pub mod summary;

pub use breaks::KeyPool;
pub use config::{
    ExhaustionPolicy, ExperimentFile, ExperimentParameters, MAX_SET_SIZE, MAX_TOTAL_TRIALS,
    OrderingStrategy, ResponseKeys,
};
pub use error::{ConfigError, GenerationError};
pub use generator::{TrialBlockGenerator, generate_trials};
pub use ordering::{OrderingFailure, adjacent_repeats};
pub use summary::{ResultsSummary, TrialOutcome, read_outcomes, summarize};

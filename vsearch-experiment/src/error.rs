//! Error types for building a trial plan.
//!
//! [`ConfigError`] is raised before any trial is generated and is always
//! fatal. [`GenerationError::ShuffleExhaustion`] only surfaces when the
//! parameters ask for a hard failure instead of a best-effort block order.

use thiserror::Error;
use vsearch_core::TargetPresence;

/// Malformed [`ExperimentParameters`](crate::ExperimentParameters).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("number of blocks must be at least 1")]
    NoBlocks,

    #[error("at least one set size is required")]
    NoSetSizes,

    #[error("set size {0} is invalid: must be between 1 and {max}", max = crate::config::MAX_SET_SIZE)]
    InvalidSetSize(usize),

    #[error("set size {0} is listed more than once")]
    DuplicateSetSize(usize),

    #[error("a run may hold at most {max} trials")]
    TooManyTrials { max: usize },

    #[error("at least one target condition is required")]
    NoTargetConditions,

    #[error("target condition {0:?} is listed more than once")]
    DuplicateTargetCondition(TargetPresence),

    #[error("at least one distractor condition is required")]
    NoDistractors,

    #[error("distractor condition #{index} has an empty label")]
    EmptyDistractorLabel {
        /// Position in the distractor list.
        index: usize,
    },

    #[error("distractor label `{0}` is used by more than one condition")]
    DuplicateDistractorLabel(String),

    #[error("distractor condition `{0}` has no stimuli")]
    EmptyDistractorPool(String),

    #[error("target `{target}` also appears in distractor condition `{label}`")]
    TargetInDistractorPool { target: String, label: String },

    #[error("present and absent responses share the key '{0}'")]
    SameResponseKeys(char),

    #[error("break interval must be at least 1 block")]
    ZeroBreakInterval,

    #[error("{needed} breaks need distinct keys but only {available} are available")]
    BreakKeysExhausted { needed: usize, available: usize },

    #[error("rejection ordering needs at least one attempt")]
    ZeroAttempts,
}

/// Failure while generating the timeline.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No ordering without neighbouring repeats was found for a block.
    #[error(
        "block {block_index}: no order without repeated distractor types after {attempts} attempts \
         (best effort has {adjacent_repeats} repeats)"
    )]
    ShuffleExhaustion {
        block_index: usize,
        attempts: u32,
        adjacent_repeats: usize,
    },
}

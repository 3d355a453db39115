use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use vsearch_core::{DistractorCondition, StimulusId, TargetPresence};

/// Keys used to answer a search trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseKeys {
    pub present: char,
    pub absent: char,
}

impl ResponseKeys {
    pub fn for_presence(&self, presence: TargetPresence) -> char {
        match presence {
            TargetPresence::Present => self.present,
            TargetPresence::Absent => self.absent,
        }
    }
}

impl Default for ResponseKeys {
    fn default() -> Self {
        Self {
            present: 'f',
            absent: 'j',
        }
    }
}

/// How trials inside a block are ordered so neighbours differ in distractor type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum OrderingStrategy {
    /// Constructive weighted interleave; never retries
    #[default]
    Interleave,
    /// Shuffle and check, giving up after `max_attempts`
    Rejection { max_attempts: u32 },
}

/// What to do with a block that has no valid order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    #[default]
    BestEffort,
    Fail,
}

/// Everything the generator needs to build one run. Never mutated during
/// generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentParameters {
    pub num_blocks: usize,
    pub set_sizes: Vec<usize>,
    pub target_conditions: Vec<TargetPresence>,
    pub target: StimulusId,
    /// Insert a break after every n-th block (never after the last one).
    /// A file without this key runs without breaks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_interval: Option<usize>,
    /// Also keep the first trial of a block apart from the last trial of the
    /// previous block
    pub adjacency_across_blocks: bool,
    pub on_exhaustion: ExhaustionPolicy,
    pub response_keys: ResponseKeys,
    pub ordering: OrderingStrategy,
    pub distractors: Vec<DistractorCondition>,
}

impl Default for ExperimentParameters {
    fn default() -> Self {
        Self {
            num_blocks: 20,
            set_sizes: vec![3, 6, 9],
            target_conditions: vec![TargetPresence::Present, TargetPresence::Absent],
            target: StimulusId::new("img/T.png"),
            break_interval: Some(5),
            adjacency_across_blocks: false,
            on_exhaustion: ExhaustionPolicy::BestEffort,
            response_keys: ResponseKeys::default(),
            ordering: OrderingStrategy::Interleave,
            distractors: vec![
                DistractorCondition::fixed("uniform", "img/L_0.png"),
                DistractorCondition::pool(
                    "rotated",
                    ["img/L_90.png", "img/L_180.png", "img/L_270.png"],
                ),
                DistractorCondition::pool(
                    "mixed",
                    ["img/L_0.png", "img/L_90.png", "img/L_180.png", "img/L_270.png"],
                ),
            ],
        }
    }
}

/// Largest display a trial may ask for
pub const MAX_SET_SIZE: usize = 64;

/// Upper bound on trials per run, breaks excluded
pub const MAX_TOTAL_TRIALS: usize = 1_000_000;

/// Candidate break keys before response keys are removed
pub const BREAK_KEY_ALPHABET: std::ops::RangeInclusive<char> = 'a'..='z';

impl ExperimentParameters {
    pub fn trials_per_block(&self) -> usize {
        self.set_sizes
            .len()
            .saturating_mul(self.target_conditions.len())
            .saturating_mul(self.distractors.len())
    }

    /// Saturates on overflow; `validate` rejects anything above
    /// [`MAX_TOTAL_TRIALS`]
    pub fn total_trials(&self) -> usize {
        self.checked_total_trials().unwrap_or(usize::MAX)
    }

    fn checked_total_trials(&self) -> Option<usize> {
        self.set_sizes
            .len()
            .checked_mul(self.target_conditions.len())?
            .checked_mul(self.distractors.len())?
            .checked_mul(self.num_blocks)
    }

    /// Breaks fall after blocks `n, 2n, ...` but never after the final block
    pub fn break_count(&self) -> usize {
        match self.break_interval {
            Some(n) if n > 0 => self.num_blocks.saturating_sub(1) / n,
            _ => 0,
        }
    }

    /// Keys that may be assigned to breaks
    pub fn break_key_candidates(&self) -> Vec<char> {
        let ResponseKeys { present, absent } = self.response_keys;
        BREAK_KEY_ALPHABET
            .filter(|k| !k.eq_ignore_ascii_case(&present) && !k.eq_ignore_ascii_case(&absent))
            .collect()
    }

    /// Check the parameters without generating anything
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_blocks == 0 {
            return Err(ConfigError::NoBlocks);
        }

        if self.set_sizes.is_empty() {
            return Err(ConfigError::NoSetSizes);
        }
        for (i, &size) in self.set_sizes.iter().enumerate() {
            if size == 0 || size > MAX_SET_SIZE {
                return Err(ConfigError::InvalidSetSize(size));
            }
            if self.set_sizes[..i].contains(&size) {
                return Err(ConfigError::DuplicateSetSize(size));
            }
        }

        if self.target_conditions.is_empty() {
            return Err(ConfigError::NoTargetConditions);
        }
        for (i, cond) in self.target_conditions.iter().enumerate() {
            if self.target_conditions[..i].contains(cond) {
                return Err(ConfigError::DuplicateTargetCondition(*cond));
            }
        }

        if self.distractors.is_empty() {
            return Err(ConfigError::NoDistractors);
        }
        for (i, cond) in self.distractors.iter().enumerate() {
            if cond.label.trim().is_empty() {
                return Err(ConfigError::EmptyDistractorLabel { index: i });
            }
            if self.distractors[..i].iter().any(|c| c.label == cond.label) {
                return Err(ConfigError::DuplicateDistractorLabel(cond.label.clone()));
            }
            if cond.source.is_empty() {
                return Err(ConfigError::EmptyDistractorPool(cond.label.clone()));
            }
            if cond.source.contains(&self.target) {
                return Err(ConfigError::TargetInDistractorPool {
                    target: self.target.to_string(),
                    label: cond.label.clone(),
                });
            }
        }

        match self.checked_total_trials() {
            Some(total) if total <= MAX_TOTAL_TRIALS => {}
            _ => {
                return Err(ConfigError::TooManyTrials {
                    max: MAX_TOTAL_TRIALS,
                });
            }
        }

        let ResponseKeys { present, absent } = self.response_keys;
        if present.eq_ignore_ascii_case(&absent) {
            return Err(ConfigError::SameResponseKeys(present));
        }

        if self.break_interval == Some(0) {
            return Err(ConfigError::ZeroBreakInterval);
        }
        let needed = self.break_count();
        let available = self.break_key_candidates().len();
        if needed > available {
            return Err(ConfigError::BreakKeysExhausted { needed, available });
        }

        if let OrderingStrategy::Rejection { max_attempts: 0 } = self.ordering {
            return Err(ConfigError::ZeroAttempts);
        }

        Ok(())
    }
}

/// On-disk experiment description (TOML)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub parameters: ExperimentParameters,
}

impl ExperimentFile {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_shape() {
        let params = ExperimentParameters::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.trials_per_block(), 18);
        assert_eq!(params.total_trials(), 360);
        assert_eq!(params.break_count(), 3);
    }

    #[test]
    fn rejects_empty_and_zero_sizes() {
        let mut params = ExperimentParameters::default();
        params.set_sizes.clear();
        assert_eq!(params.validate(), Err(ConfigError::NoSetSizes));

        params.set_sizes = vec![3, 0];
        assert_eq!(params.validate(), Err(ConfigError::InvalidSetSize(0)));

        params.set_sizes = vec![3, 6, 3];
        assert_eq!(params.validate(), Err(ConfigError::DuplicateSetSize(3)));

        params.set_sizes = vec![3, MAX_SET_SIZE + 1];
        assert_eq!(
            params.validate(),
            Err(ConfigError::InvalidSetSize(MAX_SET_SIZE + 1))
        );
    }

    #[test]
    fn rejects_oversized_runs_from_toml() {
        let file = ExperimentFile::from_toml_str(
            "[parameters]\nnum_blocks = 2000000000000000000\nbreak_interval = 1000000000000000000\n",
        )
        .unwrap();
        let params = &file.parameters;
        assert_eq!(params.total_trials(), usize::MAX);
        assert_eq!(
            params.validate(),
            Err(ConfigError::TooManyTrials {
                max: MAX_TOTAL_TRIALS
            })
        );

        // 18 trials per block
        let params = ExperimentParameters {
            num_blocks: MAX_TOTAL_TRIALS / 18 + 1,
            break_interval: None,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::TooManyTrials { .. })
        ));
    }

    #[test]
    fn rejects_zero_blocks() {
        let params = ExperimentParameters {
            num_blocks: 0,
            ..Default::default()
        };
        assert_eq!(params.validate(), Err(ConfigError::NoBlocks));
    }

    #[test]
    fn rejects_bad_target_conditions() {
        let mut params = ExperimentParameters::default();
        params.target_conditions.clear();
        assert_eq!(params.validate(), Err(ConfigError::NoTargetConditions));

        params.target_conditions = vec![TargetPresence::Absent, TargetPresence::Absent];
        assert_eq!(
            params.validate(),
            Err(ConfigError::DuplicateTargetCondition(TargetPresence::Absent))
        );
    }

    #[test]
    fn rejects_bad_distractors() {
        let mut params = ExperimentParameters::default();
        params.distractors.clear();
        assert_eq!(params.validate(), Err(ConfigError::NoDistractors));

        params.distractors = vec![DistractorCondition::pool("empty", Vec::<&str>::new())];
        assert_eq!(
            params.validate(),
            Err(ConfigError::EmptyDistractorPool("empty".into()))
        );

        params.distractors = vec![
            DistractorCondition::fixed("a", "x.png"),
            DistractorCondition::fixed("a", "y.png"),
        ];
        assert_eq!(
            params.validate(),
            Err(ConfigError::DuplicateDistractorLabel("a".into()))
        );

        params.distractors = vec![DistractorCondition::fixed(" ", "x.png")];
        assert_eq!(
            params.validate(),
            Err(ConfigError::EmptyDistractorLabel { index: 0 })
        );

        params.distractors = vec![DistractorCondition::pool("a", ["x.png", "img/T.png"])];
        assert!(matches!(
            params.validate(),
            Err(ConfigError::TargetInDistractorPool { .. })
        ));
    }

    #[test]
    fn rejects_bad_keys_and_breaks() {
        let mut params = ExperimentParameters::default();
        params.response_keys = ResponseKeys {
            present: 'f',
            absent: 'F',
        };
        assert_eq!(params.validate(), Err(ConfigError::SameResponseKeys('f')));

        params.response_keys = ResponseKeys::default();
        params.break_interval = Some(0);
        assert_eq!(params.validate(), Err(ConfigError::ZeroBreakInterval));

        // 30 breaks, 24 keys
        params.break_interval = Some(1);
        params.num_blocks = 31;
        assert_eq!(
            params.validate(),
            Err(ConfigError::BreakKeysExhausted {
                needed: 30,
                available: 24
            })
        );

        params.num_blocks = 25;
        assert!(params.validate().is_ok());
    }

    #[test]
    fn rejects_zero_attempts() {
        let params = ExperimentParameters {
            ordering: OrderingStrategy::Rejection { max_attempts: 0 },
            ..Default::default()
        };
        assert_eq!(params.validate(), Err(ConfigError::ZeroAttempts));
    }

    #[test]
    fn break_keys_skip_response_keys() {
        let keys = ExperimentParameters::default().break_key_candidates();
        assert_eq!(keys.len(), 24);
        assert!(!keys.contains(&'f'));
        assert!(!keys.contains(&'j'));
    }

    #[test]
    fn parses_partial_toml() {
        let file = ExperimentFile::from_toml_str(
            r#"
            seed = 7

            [parameters]
            num_blocks = 2
            set_sizes = [4, 8]
            target = "stim/target.png"

            [parameters.ordering]
            strategy = "rejection"
            max_attempts = 50

            [[parameters.distractors]]
            label = "plain"
            stimuli = "stim/d.png"

            [[parameters.distractors]]
            label = "varied"
            stimuli = ["stim/d1.png", "stim/d2.png"]
            "#,
        )
        .unwrap();

        assert_eq!(file.seed, Some(7));
        let params = &file.parameters;
        assert_eq!(params.num_blocks, 2);
        assert_eq!(params.set_sizes, vec![4, 8]);
        assert_eq!(params.target_conditions.len(), 2);
        assert_eq!(params.ordering, OrderingStrategy::Rejection { max_attempts: 50 });
        assert_eq!(params.distractors[0], DistractorCondition::fixed("plain", "stim/d.png"));
        assert_eq!(params.trials_per_block(), 8);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = ExperimentFile::from_toml_str("[parameters]\nnum_block = 3\n");
        assert!(err.is_err());
    }

    #[test]
    fn default_file_round_trips() {
        let file = ExperimentFile {
            seed: Some(42),
            ..Default::default()
        };
        let text = file.to_toml_string().unwrap();
        assert!(text.contains("break_interval = 5"));
        assert_eq!(ExperimentFile::from_toml_str(&text).unwrap(), file);
    }

    #[test]
    fn file_without_breaks_round_trips() {
        let mut file = ExperimentFile::default();
        file.parameters.break_interval = None;
        let text = file.to_toml_string().unwrap();
        assert!(!text.contains("break_interval"));

        let back = ExperimentFile::from_toml_str(&text).unwrap();
        assert_eq!(back.parameters.break_interval, None);
        assert_eq!(back.parameters.break_count(), 0);
        assert_eq!(back, file);
    }
}

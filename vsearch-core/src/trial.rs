use crate::stimulus::StimulusId;
use serde::{Deserialize, Serialize};

/// Items that the block orderer can keep apart by category
pub trait Categorized {
    fn category(&self) -> &str;
}

impl Categorized for &str {
    fn category(&self) -> &str {
        self
    }
}

impl Categorized for String {
    fn category(&self) -> &str {
        self.as_str()
    }
}

/// Whether the target is shown in a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPresence {
    Present,
    Absent,
}

impl TargetPresence {
    pub fn is_present(&self) -> bool {
        matches!(self, TargetPresence::Present)
    }
}

impl From<bool> for TargetPresence {
    fn from(present: bool) -> Self {
        if present {
            TargetPresence::Present
        } else {
            TargetPresence::Absent
        }
    }
}

/// One visual-search trial as handed to the presentation layer.
///
/// When the target is present it is always `stimuli[0]`; placement on screen
/// is the presentation layer's business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialSpec {
    pub stimuli: Vec<StimulusId>,
    pub target_present: bool,
    pub set_size: usize,
    pub distractor_type: String,
    pub block_index: usize,
    pub trial_index: usize,
    pub correct_key: char,
}

impl TrialSpec {
    pub fn presence(&self) -> TargetPresence {
        self.target_present.into()
    }

    /// Number of slots holding `id`
    pub fn count_of(&self, id: &StimulusId) -> usize {
        self.stimuli.iter().filter(|s| *s == id).count()
    }

    pub fn is_correct(&self, key: char) -> bool {
        key.eq_ignore_ascii_case(&self.correct_key)
    }
}

impl Categorized for TrialSpec {
    fn category(&self) -> &str {
        &self.distractor_type
    }
}

/// Ordered trials of one block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPlan {
    pub block_index: usize,
    pub trials: Vec<TrialSpec>,
}

impl BlockPlan {
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Count of neighbouring trials that share a distractor type
    pub fn adjacent_repeats(&self) -> usize {
        self.trials
            .windows(2)
            .filter(|w| w[0].distractor_type == w[1].distractor_type)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(distractor: &str, present: bool) -> TrialSpec {
        let mut stimuli = vec![StimulusId::new("d.png"); 3];
        if present {
            stimuli[0] = StimulusId::new("t.png");
        }
        TrialSpec {
            stimuli,
            target_present: present,
            set_size: 3,
            distractor_type: distractor.to_string(),
            block_index: 0,
            trial_index: 0,
            correct_key: if present { 'f' } else { 'j' },
        }
    }

    #[test]
    fn trial_json_uses_camel_case() {
        let json = serde_json::to_value(trial("A", true)).unwrap();
        assert_eq!(json["targetPresent"], true);
        assert_eq!(json["setSize"], 3);
        assert_eq!(json["distractorType"], "A");
        assert_eq!(json["correctKey"], "f");
        assert_eq!(json["stimuli"][0], "t.png");
    }

    #[test]
    fn correctness_ignores_case() {
        let t = trial("A", false);
        assert!(t.is_correct('j'));
        assert!(t.is_correct('J'));
        assert!(!t.is_correct('f'));
    }

    #[test]
    fn block_counts_adjacent_repeats() {
        let block = BlockPlan {
            block_index: 0,
            trials: vec![trial("A", true), trial("A", false), trial("B", true), trial("A", true)],
        };
        assert_eq!(block.adjacent_repeats(), 1);
        assert_eq!(block.trials[0].count_of(&StimulusId::new("t.png")), 1);
    }
}

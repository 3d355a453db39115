use crate::stimulus::StimulusId;
use crate::trial::{BlockPlan, TrialSpec};
use serde::{Deserialize, Serialize};
use vsearch_cache::StimulusCatalog;

/// Rest break between blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakMarker {
    pub after_block: usize,
    pub blocks_completed: usize,
    pub blocks_total: usize,
    /// Key the participant has to press to continue
    pub key: char,
}

impl BreakMarker {
    pub fn prompt(&self) -> String {
        format!(
            "You have completed {} of {} blocks. Take a short break. Press the '{}' key to continue.",
            self.blocks_completed,
            self.blocks_total,
            self.key.to_ascii_uppercase()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineEntry {
    Trial(TrialSpec),
    Break(BreakMarker),
}

impl TimelineEntry {
    pub fn as_trial(&self) -> Option<&TrialSpec> {
        match self {
            TimelineEntry::Trial(t) => Some(t),
            TimelineEntry::Break(_) => None,
        }
    }

    pub fn as_break(&self) -> Option<&BreakMarker> {
        match self {
            TimelineEntry::Break(b) => Some(b),
            TimelineEntry::Trial(_) => None,
        }
    }
}

/// The full experiment run: all blocks in order with break markers between
/// them. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn new(entries: Vec<TimelineEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TimelineEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn trials(&self) -> impl Iterator<Item = &TrialSpec> {
        self.entries.iter().filter_map(TimelineEntry::as_trial)
    }

    pub fn breaks(&self) -> impl Iterator<Item = &BreakMarker> {
        self.entries.iter().filter_map(TimelineEntry::as_break)
    }

    pub fn trial_count(&self) -> usize {
        self.trials().count()
    }

    /// Regroup trials into their blocks, in timeline order
    pub fn blocks(&self) -> Vec<BlockPlan> {
        let mut blocks: Vec<BlockPlan> = Vec::new();
        for trial in self.trials() {
            if let Some(block) = blocks
                .last_mut()
                .filter(|b| b.block_index == trial.block_index)
            {
                block.trials.push(trial.clone());
                continue;
            }
            blocks.push(BlockPlan {
                block_index: trial.block_index,
                trials: vec![trial.clone()],
            });
        }
        blocks
    }

    /// Distinct stimuli in order of first appearance, for preloading
    pub fn preload(&self) -> Vec<StimulusId> {
        let mut catalog = StimulusCatalog::new();
        for stimulus in self.trials().flat_map(|t| t.stimuli.iter()) {
            catalog.insert(stimulus.atom());
        }
        catalog
            .into_atoms()
            .into_iter()
            .map(|atom| StimulusId::from(&*atom))
            .collect()
    }
}

impl From<Vec<TimelineEntry>> for Timeline {
    fn from(entries: Vec<TimelineEntry>) -> Self {
        Self::new(entries)
    }
}

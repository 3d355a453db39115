//! Factorial trial-block generator.
//!
//! Every block holds exactly one trial per `set size x target condition x
//! distractor condition` combination. Blocks are ordered so that neighbouring
//! trials differ in distractor type, and optional rest breaks are placed
//! between blocks.

use crate::breaks::KeyPool;
use crate::config::{ExhaustionPolicy, ExperimentParameters};
use crate::error::{ConfigError, GenerationError};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{debug, info, warn};
use vsearch_core::{
    BlockPlan, BreakMarker, DistractorCondition, DistractorSource, StimulusId, TargetPresence,
    Timeline, TimelineEntry, TrialSpec,
};

/// Builds the trial timeline for one experiment run.
#[derive(Debug, Clone)]
pub struct TrialBlockGenerator {
    params: ExperimentParameters,
}

impl TrialBlockGenerator {
    /// Validate the parameters up front; generation never sees a bad config.
    pub fn new(params: ExperimentParameters) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn parameters(&self) -> &ExperimentParameters {
        &self.params
    }

    /// Unordered trials of one block, in enumeration order: set size
    /// outermost, distractor condition innermost.
    pub fn block_trials<R: Rng + ?Sized>(&self, block_index: usize, rng: &mut R) -> Vec<TrialSpec> {
        let mut trials = Vec::with_capacity(self.params.trials_per_block());
        for &set_size in &self.params.set_sizes {
            for &presence in &self.params.target_conditions {
                for distractor in &self.params.distractors {
                    let index = trials.len();
                    trials.push(self.build_trial(
                        block_index,
                        index,
                        set_size,
                        presence,
                        distractor,
                        rng,
                    ));
                }
            }
        }
        trials
    }

    fn build_trial<R: Rng + ?Sized>(
        &self,
        block_index: usize,
        trial_index: usize,
        set_size: usize,
        presence: TargetPresence,
        distractor: &DistractorCondition,
        rng: &mut R,
    ) -> TrialSpec {
        let mut stimuli = Vec::with_capacity(set_size);
        if presence.is_present() {
            stimuli.push(self.params.target.clone());
        }
        let slots = set_size - stimuli.len();
        fill_from(&distractor.source, slots, &mut stimuli, rng);

        TrialSpec {
            stimuli,
            target_present: presence.is_present(),
            set_size,
            distractor_type: distractor.label.clone(),
            block_index,
            trial_index,
            correct_key: self.params.response_keys.for_presence(presence),
        }
    }

    /// Order one block's trials and renumber them by position.
    pub fn order_block<R: Rng + ?Sized>(
        &self,
        block_index: usize,
        trials: Vec<TrialSpec>,
        previous: Option<&str>,
        rng: &mut R,
    ) -> Result<BlockPlan, GenerationError> {
        let mut ordered = match self.params.ordering.arrange(trials, previous, rng) {
            Ok(ordered) => ordered,
            Err(failure) => match self.params.on_exhaustion {
                ExhaustionPolicy::Fail => {
                    return Err(GenerationError::ShuffleExhaustion {
                        block_index,
                        attempts: failure.attempts,
                        adjacent_repeats: failure.adjacent_repeats,
                    });
                }
                ExhaustionPolicy::BestEffort => {
                    warn!(
                        block = block_index,
                        attempts = failure.attempts,
                        repeats = failure.adjacent_repeats,
                        "no block order without repeated distractor types, using best effort"
                    );
                    failure.best_effort
                }
            },
        };

        for (i, trial) in ordered.iter_mut().enumerate() {
            trial.trial_index = i;
        }
        Ok(BlockPlan {
            block_index,
            trials: ordered,
        })
    }

    fn break_due(&self, block_index: usize) -> bool {
        let completed = block_index + 1;
        match self.params.break_interval {
            Some(n) if n > 0 => completed % n == 0 && completed < self.params.num_blocks,
            _ => false,
        }
    }

    /// Generate every block, in order, with break markers between them.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Timeline, GenerationError> {
        let params = &self.params;
        let mut keys = KeyPool::for_parameters(params, rng);
        let mut entries = Vec::with_capacity(params.total_trials() + params.break_count());
        let mut previous: Option<String> = None;

        for block_index in 0..params.num_blocks {
            let trials = self.block_trials(block_index, rng);
            let carry = previous.as_deref().filter(|_| params.adjacency_across_blocks);
            let block = self.order_block(block_index, trials, carry, rng)?;
            debug!(
                block = block_index,
                trials = block.len(),
                repeats = block.adjacent_repeats(),
                "block ordered"
            );

            previous = block.trials.last().map(|t| t.distractor_type.clone());
            entries.extend(block.trials.into_iter().map(TimelineEntry::Trial));

            if self.break_due(block_index) {
                let key = keys.draw().ok_or_else(|| ConfigError::BreakKeysExhausted {
                    needed: params.break_count(),
                    available: params.break_key_candidates().len(),
                })?;
                entries.push(TimelineEntry::Break(BreakMarker {
                    after_block: block_index,
                    blocks_completed: block_index + 1,
                    blocks_total: params.num_blocks,
                    key,
                }));
            }
        }

        let timeline = Timeline::new(entries);
        info!(
            blocks = params.num_blocks,
            breaks = timeline.breaks().count(),
            "Total trials: {}",
            timeline.trial_count()
        );
        Ok(timeline)
    }
}

/// Fill `slots` positions: a fixed stimulus is repeated, a pool is sampled
/// uniformly with replacement.
fn fill_from<R: Rng + ?Sized>(
    source: &DistractorSource,
    slots: usize,
    out: &mut Vec<StimulusId>,
    rng: &mut R,
) {
    match source {
        DistractorSource::Fixed(id) => out.extend(std::iter::repeat_n(id.clone(), slots)),
        DistractorSource::Pool(ids) => {
            out.extend((0..slots).filter_map(|_| ids.choose(&mut *rng).cloned()));
        }
    }
}

/// Validate `params` and generate the whole timeline.
pub fn generate_trials<R: Rng + ?Sized>(
    params: &ExperimentParameters,
    rng: &mut R,
) -> Result<Timeline, GenerationError> {
    TrialBlockGenerator::new(params.clone())?.generate(rng)
}

//! Post-hoc reduction of collected trial results.
//!
//! Response times are averaged over correct responses only. Accuracy counts
//! every trial, so a missing response is an error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use vsearch_core::TrialSpec;

/// One collected result row, as exported by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialOutcome {
    pub block_index: usize,
    pub trial_index: usize,
    pub set_size: usize,
    pub target_present: bool,
    pub distractor_type: String,
    #[serde(default)]
    pub response: Option<char>,
    #[serde(default)]
    pub rt_ms: Option<f64>,
    pub correct: bool,
}

impl TrialOutcome {
    /// Score a response against the trial it answers
    pub fn score(trial: &TrialSpec, response: Option<char>, rt_ms: Option<f64>) -> Self {
        Self {
            block_index: trial.block_index,
            trial_index: trial.trial_index,
            set_size: trial.set_size,
            target_present: trial.target_present,
            distractor_type: trial.distractor_type.clone(),
            response,
            rt_ms,
            correct: response.is_some_and(|key| trial.is_correct(key)),
        }
    }
}

/// Read a JSON array of outcomes
pub fn read_outcomes<R: Read>(reader: R) -> serde_json::Result<Vec<TrialOutcome>> {
    serde_json::from_reader(reader)
}

#[derive(Debug, Clone, Default)]
struct Tally {
    trials: usize,
    correct: usize,
    rt_sum: f64,
    rt_count: usize,
}

impl Tally {
    fn add(&mut self, outcome: &TrialOutcome) {
        self.trials += 1;
        if outcome.correct {
            self.correct += 1;
            if let Some(rt) = outcome.rt_ms {
                self.rt_sum += rt;
                self.rt_count += 1;
            }
        }
    }

    fn accuracy(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.correct as f64 / self.trials as f64
        }
    }

    fn mean_rt(&self) -> Option<f64> {
        (self.rt_count > 0).then(|| self.rt_sum / self.rt_count as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub block_index: usize,
    pub trials: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub mean_rt_ms: Option<f64>,
}

/// One cell of the factorial design
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSummary {
    pub distractor_type: String,
    pub target_present: bool,
    pub set_size: usize,
    pub trials: usize,
    pub accuracy: f64,
    pub mean_rt_ms: Option<f64>,
}

/// Least-squares fit of mean correct RT against set size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSlope {
    pub distractor_type: String,
    pub target_present: bool,
    pub slope_ms_per_item: Option<f64>,
    pub intercept_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSummary {
    pub total_trials: usize,
    pub responded: usize,
    pub correct: usize,
    pub accuracy: Option<f64>,
    pub mean_rt_ms: Option<f64>,
    pub min_rt_ms: Option<f64>,
    pub max_rt_ms: Option<f64>,
    pub blocks: Vec<BlockSummary>,
    pub conditions: Vec<ConditionSummary>,
    pub search_slopes: Vec<SearchSlope>,
}

/// Reduce collected outcomes to accuracy and response-time summaries
pub fn summarize(outcomes: &[TrialOutcome]) -> ResultsSummary {
    let mut overall = Tally::default();
    let mut blocks: BTreeMap<usize, Tally> = BTreeMap::new();
    let mut cells: BTreeMap<(String, bool, usize), Tally> = BTreeMap::new();
    let mut min_rt: Option<f64> = None;
    let mut max_rt: Option<f64> = None;

    for outcome in outcomes {
        overall.add(outcome);
        blocks.entry(outcome.block_index).or_default().add(outcome);
        cells
            .entry((
                outcome.distractor_type.clone(),
                outcome.target_present,
                outcome.set_size,
            ))
            .or_default()
            .add(outcome);

        if let (true, Some(rt)) = (outcome.correct, outcome.rt_ms) {
            min_rt = Some(min_rt.map_or(rt, |m| m.min(rt)));
            max_rt = Some(max_rt.map_or(rt, |m| m.max(rt)));
        }
    }

    let conditions: Vec<ConditionSummary> = cells
        .into_iter()
        .map(|((distractor_type, target_present, set_size), tally)| ConditionSummary {
            distractor_type,
            target_present,
            set_size,
            trials: tally.trials,
            accuracy: tally.accuracy(),
            mean_rt_ms: tally.mean_rt(),
        })
        .collect();

    ResultsSummary {
        total_trials: overall.trials,
        responded: outcomes.iter().filter(|o| o.response.is_some()).count(),
        correct: overall.correct,
        accuracy: (overall.trials > 0).then(|| overall.accuracy()),
        mean_rt_ms: overall.mean_rt(),
        min_rt_ms: min_rt,
        max_rt_ms: max_rt,
        blocks: blocks
            .into_iter()
            .map(|(block_index, tally)| BlockSummary {
                block_index,
                trials: tally.trials,
                correct: tally.correct,
                accuracy: tally.accuracy(),
                mean_rt_ms: tally.mean_rt(),
            })
            .collect(),
        search_slopes: search_slopes(&conditions),
        conditions,
    }
}

fn search_slopes(conditions: &[ConditionSummary]) -> Vec<SearchSlope> {
    let mut series: BTreeMap<(&str, bool), Vec<(f64, f64)>> = BTreeMap::new();
    for cond in conditions {
        let points = series
            .entry((cond.distractor_type.as_str(), cond.target_present))
            .or_default();
        if let Some(rt) = cond.mean_rt_ms {
            points.push((cond.set_size as f64, rt));
        }
    }

    series
        .into_iter()
        .map(|((distractor_type, target_present), points)| {
            let fit = least_squares(&points);
            SearchSlope {
                distractor_type: distractor_type.to_string(),
                target_present,
                slope_ms_per_item: fit.map(|(slope, _)| slope),
                intercept_ms: fit.map(|(_, intercept)| intercept),
            }
        })
        .collect()
}

/// `(slope, intercept)`, or `None` without two distinct x values
fn least_squares(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = points
        .iter()
        .map(|p| (p.0 - mean_x) * (p.1 - mean_y))
        .sum();
    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}

fn ms(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1} ms"))
}

impl fmt::Display for ResultsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Experiment Results:")?;
        writeln!(
            f,
            "Trials: {}, responded: {}, accuracy: {}",
            self.total_trials,
            self.responded,
            self.accuracy
                .map_or_else(|| "-".to_string(), |a| format!("{:.1}%", a * 100.0))
        )?;
        writeln!(
            f,
            "Reaction times (correct): mean {}, min {}, max {}",
            ms(self.mean_rt_ms),
            ms(self.min_rt_ms),
            ms(self.max_rt_ms)
        )?;

        if !self.blocks.is_empty() {
            writeln!(f, "\nPer block:")?;
            for b in &self.blocks {
                writeln!(
                    f,
                    "  block {:>3}: {:>3} trials, accuracy {:>5.1}%, mean RT {}",
                    b.block_index,
                    b.trials,
                    b.accuracy * 100.0,
                    ms(b.mean_rt_ms)
                )?;
            }
        }

        if !self.search_slopes.is_empty() {
            writeln!(f, "\nSearch slopes:")?;
            for s in &self.search_slopes {
                let slope = s
                    .slope_ms_per_item
                    .map_or_else(|| "-".to_string(), |v| format!("{v:.2} ms/item"));
                writeln!(
                    f,
                    "  {:<12} {:<7} {}",
                    s.distractor_type,
                    if s.target_present { "present" } else { "absent" },
                    slope
                )?;
            }
        }
        Ok(())
    }
}

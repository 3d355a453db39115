use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vsearch_core::{StimulusId, Timeline};
use vsearch_experiment::{ExperimentFile, TrialBlockGenerator, read_outcomes, summarize};

/// Plan visual-search trial blocks and summarize collected results
#[derive(Debug, Parser)]
#[command(name = "vsearch")]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write the default experiment file
    Init {
        /// Destination; prints to stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate an experiment file and generate the trial timeline
    Plan {
        #[arg(long)]
        config: PathBuf,
        /// Overrides the seed in the experiment file
        #[arg(long, env = "VSEARCH_SEED")]
        seed: Option<u64>,
        /// Destination; prints to stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        pretty: bool,
    },

    /// Summarize a JSON array of collected trial outcomes
    Summarize {
        #[arg(long)]
        results: PathBuf,
        /// Print the summary as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// What `plan` hands to the presentation layer
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDocument {
    pub seed: Option<u64>,
    pub total_trials: usize,
    pub preload: Vec<StimulusId>,
    pub timeline: Timeline,
}

pub struct App {
    cli: Cli,
}

impl App {
    pub fn new() -> Result<Self> {
        init_tracing();
        Ok(Self { cli: Cli::parse() })
    }

    pub fn run(self) -> Result<()> {
        match self.cli.command {
            Command::Init { out, force } => init(out.as_deref(), force),
            Command::Plan {
                config,
                seed,
                out,
                pretty,
            } => {
                let file = load_experiment(&config)?;
                let document = plan(&file, seed)?;
                let json = if pretty {
                    serde_json::to_string_pretty(&document)?
                } else {
                    serde_json::to_string(&document)?
                };
                write_output(out.as_deref(), &json)
            }
            Command::Summarize { results, json } => {
                let text = summarize_file(&results, json)?;
                print!("{text}");
                Ok(())
            }
        }
    }
}

/// Logs go to stderr so stdout stays usable for JSON output
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn init(out: Option<&Path>, force: bool) -> Result<()> {
    if let Some(path) = out {
        if path.exists() && !force {
            bail!("{} already exists, pass --force to overwrite", path.display());
        }
    }
    let text = ExperimentFile::default()
        .to_toml_string()
        .context("Failed to serialize default experiment")?;
    write_output(out, &text)
}

pub fn load_experiment(path: &Path) -> Result<ExperimentFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read experiment file {}", path.display()))?;
    ExperimentFile::from_toml_str(&text)
        .with_context(|| format!("Invalid experiment file {}", path.display()))
}

pub fn plan(file: &ExperimentFile, seed_override: Option<u64>) -> Result<PlanDocument> {
    let generator = TrialBlockGenerator::new(file.parameters.clone())
        .context("Experiment parameters rejected")?;

    let seed = seed_override.or(file.seed);
    let mut rng: Box<dyn RngCore> = match seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
        None => {
            warn!("no seed given, this plan cannot be reproduced");
            Box::new(rand::rng())
        }
    };

    let timeline = generator.generate(&mut rng)?;
    let preload = timeline.preload();
    info!(
        stimuli = preload.len(),
        entries = timeline.len(),
        "plan ready"
    );

    Ok(PlanDocument {
        seed,
        total_trials: timeline.trial_count(),
        preload,
        timeline,
    })
}

pub fn summarize_file(path: &Path, as_json: bool) -> Result<String> {
    let reader = fs::File::open(path)
        .with_context(|| format!("Cannot open results file {}", path.display()))?;
    let outcomes = read_outcomes(std::io::BufReader::new(reader))
        .with_context(|| format!("Invalid results file {}", path.display()))?;
    info!(rows = outcomes.len(), "results loaded");

    let summary = summarize(&outcomes);
    if as_json {
        Ok(serde_json::to_string_pretty(&summary)? + "\n")
    } else {
        Ok(summary.to_string())
    }
}

fn write_output(out: Option<&Path>, contents: &str) -> Result<()> {
    match out {
        Some(path) => {
            fs::write(path, contents)
                .with_context(|| format!("Cannot write {}", path.display()))?;
            info!(path = %path.display(), "written");
        }
        None => println!("{contents}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use vsearch_experiment::TrialOutcome;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_plan_arguments() {
        let cli = Cli::try_parse_from([
            "vsearch", "plan", "--config", "exp.toml", "--seed", "9", "--pretty",
        ])
        .unwrap();
        match cli.command {
            Command::Plan {
                config,
                seed,
                out,
                pretty,
            } => {
                assert_eq!(config, PathBuf::from("exp.toml"));
                assert_eq!(seed, Some(9));
                assert_eq!(out, None);
                assert!(pretty);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn init_then_plan_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experiment.toml");

        init(Some(&path), false).unwrap();
        assert!(init(Some(&path), false).is_err());
        init(Some(&path), true).unwrap();

        let file = load_experiment(&path).unwrap();
        let document = plan(&file, Some(5)).unwrap();
        assert_eq!(document.seed, Some(5));
        assert_eq!(document.total_trials, 360);
        assert_eq!(document.timeline.breaks().count(), 3);

        let again = plan(&file, Some(5)).unwrap();
        assert_eq!(again.timeline, document.timeline);
    }

    #[test]
    fn plan_rejects_invalid_parameters() {
        let mut file = ExperimentFile::default();
        file.parameters.distractors.clear();
        let err = plan(&file, Some(1)).unwrap_err();
        assert!(format!("{err:#}").contains("distractor"));
    }

    #[test]
    fn load_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[parameters\nnum_blocks = ").unwrap();
        let err = load_experiment(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid experiment file"));
    }

    #[test]
    fn summarizes_results_file() {
        let mut file = ExperimentFile::default();
        file.parameters.num_blocks = 1;
        let document = plan(&file, Some(3)).unwrap();
        let outcomes: Vec<TrialOutcome> = document
            .timeline
            .trials()
            .map(|t| TrialOutcome::score(t, Some(t.correct_key), Some(450.0)))
            .collect();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        fs::write(&path, serde_json::to_string(&outcomes).unwrap()).unwrap();

        let text = summarize_file(&path, false).unwrap();
        assert!(text.contains("Trials: 18"));
        assert!(text.contains("100.0%"));

        let json: serde_json::Value =
            serde_json::from_str(&summarize_file(&path, true).unwrap()).unwrap();
        assert_eq!(json["totalTrials"], 18);
        assert_eq!(json["meanRtMs"], 450.0);
        assert_eq!(json["blocks"][0]["blockIndex"], 0);
    }
}

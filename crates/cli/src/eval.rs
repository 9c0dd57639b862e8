//! `offergrade run | validate | score` — config-driven evaluation.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use offergrade_linkage::config::EvalConfig;
use offergrade_linkage::engine::{batch_report, evaluate, run_unit, unit_report};
use offergrade_linkage::ingest::{decode_candidates, load_ground_truth, GroundTruthRow};
use offergrade_linkage::model::{BatchReport, UnitReport};
use rayon::prelude::*;

use crate::exit_codes::{EXIT_BELOW_THRESHOLD, EXIT_ERROR};
use crate::CliError;

#[derive(Subcommand)]
pub enum EvalCommands {
    /// Evaluate the units of a TOML config file
    #[command(after_help = "\
Examples:
  offergrade run eval.toml
  offergrade run eval.toml --unit agro-sur-0314 --json
  offergrade run eval.toml --output report.json --csv results.csv
  offergrade run eval.toml --fail-under 0.8")]
    Run {
        /// Path to the evaluation config
        config: PathBuf,

        /// Only evaluate the named unit (repeatable)
        #[arg(long = "unit", value_name = "NAME")]
        units: Vec<String>,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file (overrides [output] json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the per-field results table as CSV (overrides [output] csv)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Exit 8 when the overall mean similarity is below this value
        #[arg(long, value_name = "SCORE")]
        fail_under: Option<f64>,
    },

    /// Validate an evaluation config without running
    #[command(after_help = "\
Examples:
  offergrade validate eval.toml")]
    Validate {
        /// Path to the evaluation config
        config: PathBuf,
    },

    /// Score a whole ground-truth CSV against one candidate payload
    #[command(after_help = "\
Examples:
  offergrade score eval.toml --ground-truth labeled.csv --candidates offers.json
  offergrade score eval.toml --candidates offers.json --json")]
    Score {
        /// Config providing [scoring] and [normalize]
        config: PathBuf,

        /// Ground-truth CSV (defaults to [ground_truth] file)
        #[arg(long)]
        ground_truth: Option<PathBuf>,

        /// Candidate JSON payload
        #[arg(long)]
        candidates: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the per-field results table as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Exit 8 when the mean similarity is below this value
        #[arg(long, value_name = "SCORE")]
        fail_under: Option<f64>,
    },
}

/// Where the report goes and what makes the run fail.
struct Emit {
    json: bool,
    output: Option<PathBuf>,
    csv: Option<PathBuf>,
    fail_under: Option<f64>,
}

pub fn cmd_eval(cmd: EvalCommands) -> Result<(), CliError> {
    match cmd {
        EvalCommands::Run { config, units, json, output, csv, fail_under } => {
            cmd_run(config, units, Emit { json, output, csv, fail_under })
        }
        EvalCommands::Validate { config } => cmd_validate(config),
        EvalCommands::Score { config, ground_truth, candidates, json, output, csv, fail_under } => {
            cmd_score(config, ground_truth, candidates, Emit { json, output, csv, fail_under })
        }
    }
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::runtime(format!("cannot read {}: {e}", path.display())))
}

fn load_config(config_path: &Path) -> Result<EvalConfig, CliError> {
    let config_str = read_file(config_path)?;
    EvalConfig::from_toml(&config_str).map_err(|e| CliError::config(e.to_string()))
}

/// Config-relative paths resolve against the config file's directory.
fn base_dir(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or_else(|| Path::new("."))
}

fn check_threshold(fail_under: Option<f64>) -> Result<(), CliError> {
    match fail_under {
        Some(t) if !(0.0..=1.0).contains(&t) => Err(CliError::usage(format!(
            "--fail-under must be within [0, 1], got {t}"
        ))),
        _ => Ok(()),
    }
}

fn load_rows(path: &Path, config: &EvalConfig, selection_columns: &[&str]) -> Result<Vec<GroundTruthRow>, CliError> {
    let csv_data = read_file(path)?;
    Ok(load_ground_truth(&csv_data, &config.scoring, &config.normalize, selection_columns)?)
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

fn cmd_run(config_path: PathBuf, unit_names: Vec<String>, mut emit: Emit) -> Result<(), CliError> {
    check_threshold(emit.fail_under)?;
    let config = load_config(&config_path)?;
    let dir = base_dir(&config_path);

    let units = config
        .units_named(&unit_names)
        .map_err(|e| CliError::usage(e.to_string()))?;
    if units.is_empty() {
        return Err(CliError::usage("config defines no [[units]]")
            .with_hint("add [[units]] entries, or use `offergrade score` for a single payload"));
    }

    let ground_truth = config
        .ground_truth
        .as_ref()
        .ok_or_else(|| CliError::config("units require a [ground_truth] file"))?;
    let rows = load_rows(&dir.join(&ground_truth.file), &config, &config.selection.columns())?;

    tracing::info!(units = units.len(), ground_truth_rows = rows.len(), "starting evaluation");

    // Units are independent; collect keeps config order.
    let reports = units
        .par_iter()
        .map(|unit| {
            let payload = read_file(&dir.join(&unit.candidates))?;
            run_unit(&config, &rows, unit, &payload)
                .map_err(|e| CliError::from(e).with_unit(&unit.name))
        })
        .collect::<Result<Vec<UnitReport>, CliError>>()?;

    let batch = batch_report(&config, reports);

    if emit.output.is_none() {
        emit.output = config.output.json.as_ref().map(|p| dir.join(p));
    }
    if emit.csv.is_none() {
        emit.csv = config.output.csv.as_ref().map(|p| dir.join(p));
    }
    finish(&batch, &emit)
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "valid: '{}' with {} field(s), {} unit(s)",
        config.name,
        config.scoring.fields.len(),
        config.units.len(),
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// score
// ---------------------------------------------------------------------------

fn cmd_score(
    config_path: PathBuf,
    ground_truth: Option<PathBuf>,
    candidates: PathBuf,
    emit: Emit,
) -> Result<(), CliError> {
    check_threshold(emit.fail_under)?;
    let config = load_config(&config_path)?;

    let gt_path = match (ground_truth, &config.ground_truth) {
        (Some(path), _) => path,
        (None, Some(gt)) => base_dir(&config_path).join(&gt.file),
        (None, None) => {
            return Err(CliError::usage("no ground truth given")
                .with_hint("pass --ground-truth or set [ground_truth] file in the config"));
        }
    };

    let rows = load_rows(&gt_path, &config, &[])?;
    let records: Vec<_> = rows.into_iter().map(|r| r.record).collect();

    let payload = read_file(&candidates)?;
    let offers = decode_candidates(
        &payload,
        &config.candidates.offers_key,
        &config.scoring,
        &config.normalize,
    )?;

    let evaluation = evaluate(&records, &offers, &config.scoring)?;
    let unit = candidates
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "score".into());
    let batch = batch_report(&config, vec![unit_report(&config.name, &unit, evaluation)]);

    finish(&batch, &emit)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn finish(batch: &BatchReport, emit: &Emit) -> Result<(), CliError> {
    let json_str = serde_json::to_string_pretty(batch)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = emit.output {
        ensure_parent(path)?;
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::runtime(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if let Some(ref path) = emit.csv {
        ensure_parent(path)?;
        write_results_csv(path, &batch.units)?;
        eprintln!("wrote {}", path.display());
    }

    if emit.json {
        println!("{json_str}");
    }

    // Human summary to stderr
    for unit in &batch.units {
        let s = &unit.summary;
        eprintln!(
            "unit '{}': {} ground-truth row(s), {} candidate(s) — {} matched, {} missed, {} extra, mean similarity {:.3}",
            unit.meta.unit,
            s.ground_truth_rows,
            s.candidate_rows,
            s.matched_rows,
            s.unmatched_ground_truth,
            s.unmatched_candidates,
            s.mean_similarity,
        );
    }
    eprintln!(
        "'{}': {} unit(s), {} comparison(s), mean similarity {:.3}",
        batch.name, batch.summary.units, batch.summary.comparisons, batch.summary.mean_similarity,
    );

    if let Some(threshold) = emit.fail_under {
        if batch.summary.mean_similarity < threshold {
            return Err(CliError::new(
                EXIT_BELOW_THRESHOLD,
                format!(
                    "mean similarity {:.3} is below --fail-under {threshold}",
                    batch.summary.mean_similarity
                ),
            ));
        }
    }

    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), CliError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)
            .map_err(|e| CliError::runtime(format!("cannot create {}: {e}", dir.display()))),
        _ => Ok(()),
    }
}

const CSV_HEADERS: [&str; 7] = [
    "unit",
    "ground_truth_index",
    "candidate_index",
    "field",
    "ground_truth_value",
    "candidate_value",
    "similarity",
];

fn write_results_csv(path: &Path, units: &[UnitReport]) -> Result<(), CliError> {
    let io_err = |e: csv::Error| CliError::runtime(format!("cannot write {}: {e}", path.display()));
    let index = |i: Option<usize>| i.map(|i| i.to_string()).unwrap_or_default();

    let mut writer = csv::Writer::from_path(path).map_err(io_err)?;
    writer.write_record(CSV_HEADERS).map_err(io_err)?;

    for unit in units {
        for c in &unit.comparisons {
            writer
                .write_record([
                    unit.meta.unit.clone(),
                    index(c.ground_truth_index),
                    index(c.candidate_index),
                    c.field.clone(),
                    c.ground_truth_value.to_cell(),
                    c.candidate_value.to_cell(),
                    c.similarity.to_string(),
                ])
                .map_err(io_err)?;
        }
    }

    writer
        .flush()
        .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", path.display())))
}

impl CliError {
    fn with_unit(mut self, unit: &str) -> Self {
        self.message = format!("unit '{unit}': {}", self.message);
        self
    }
}

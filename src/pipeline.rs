/// Batch stride extraction over every configured trial.
///
/// Each trial ends in exactly one outcome: processed, skipped because its
/// file does not exist, or failed with the error that stopped it. Nothing is
/// dropped silently; the outcomes are written to `processing_report.csv`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use chrono::Local;
use csv::Writer;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::GaitResult;
use crate::gait_events::{extract_trial, TrialResult};
use crate::lowpass::smooth_trial;
use crate::trial_io::{enumerate_trials, read_trial, write_stride_table, ParticipantId, TrialId};

#[derive(Debug)]
pub enum TrialOutcome {
    Processed(TrialResult),
    Skipped { reason: String },
    Failed { cause: String },
}

impl TrialOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            TrialOutcome::Processed(_) => "processed",
            TrialOutcome::Skipped { .. } => "skipped",
            TrialOutcome::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Serialize)]
struct ReportRow {
    participant: String,
    group: String,
    run: String,
    status: String,
    left_strides: usize,
    right_strides: usize,
    detail: String,
    processed_at: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub struct ExtractionReport {
    pub outcomes: Vec<(TrialId, TrialOutcome)>,
    pub stride_tables: Vec<(ParticipantId, usize)>,
}

impl ExtractionReport {
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for (_, outcome) in &self.outcomes {
            match outcome {
                TrialOutcome::Processed(_) => counts.processed += 1,
                TrialOutcome::Skipped { .. } => counts.skipped += 1,
                TrialOutcome::Failed { .. } => counts.failed += 1,
            }
        }
        counts
    }
}

/// Load, optionally filter, and extract strides for one trial file.
pub fn process_trial_file(path: &Path, config: &PipelineConfig) -> GaitResult<TrialResult> {
    let mut signals = read_trial(path, &config.columns)?;
    if let Some(cutoff) = config.lowpass_cutoff_hz {
        signals = smooth_trial(&signals, cutoff)?;
    }
    extract_trial(&signals, &config.params)
}

fn run_trial(trial: &TrialId, config: &PipelineConfig) -> TrialOutcome {
    let path = trial.trial_file(&config.input_root);
    if !path.is_file() {
        log::debug!("{}: no file at {}", trial, path.display());
        return TrialOutcome::Skipped {
            reason: format!("file not found: {}", path.display()),
        };
    }

    match process_trial_file(&path, config) {
        Ok(result) => {
            log::debug!(
                "{}: {} left / {} right strides",
                trial,
                result.left.strides.len(),
                result.right.strides.len()
            );
            TrialOutcome::Processed(result)
        }
        Err(e) => {
            log::warn!("{}: {}", trial, e);
            TrialOutcome::Failed { cause: e.to_string() }
        }
    }
}

/// Stride rows of all processed runs, per participant, in run order.
fn collect_stride_rows(
    outcomes: &[(TrialId, TrialOutcome)],
) -> BTreeMap<ParticipantId, Vec<(Option<f64>, Option<f64>)>> {
    let mut tables: BTreeMap<ParticipantId, Vec<(Option<f64>, Option<f64>)>> = BTreeMap::new();
    for (trial, outcome) in outcomes {
        if let TrialOutcome::Processed(result) = outcome {
            tables
                .entry(trial.participant.clone())
                .or_default()
                .extend(result.rows.iter().copied());
        }
    }
    tables
}

/// Delete tables left by earlier runs for participants with no processed
/// trial this time, so the summary only sees current results.
fn remove_stale_tables(
    outcomes: &[(TrialId, TrialOutcome)],
    tables: &BTreeMap<ParticipantId, Vec<(Option<f64>, Option<f64>)>>,
    output_root: &Path,
) -> GaitResult<()> {
    let participants: BTreeSet<&ParticipantId> = outcomes.iter().map(|(trial, _)| &trial.participant).collect();
    for participant in participants.into_iter().filter(|p| !tables.contains_key(*p)) {
        let path = participant.strides_file(output_root);
        if path.is_file() {
            fs::remove_file(&path)?;
            log::info!("Removed stale stride table {}", path.display());
        }
    }
    Ok(())
}

fn write_report(outcomes: &[(TrialId, TrialOutcome)], output_path: &Path) -> GaitResult<()> {
    let mut wtr = Writer::from_path(output_path)?;
    let processed_at = Local::now().to_rfc3339();

    for (trial, outcome) in outcomes {
        let (left_strides, right_strides, detail) = match outcome {
            TrialOutcome::Processed(result) => {
                (result.left.strides.len(), result.right.strides.len(), String::new())
            }
            TrialOutcome::Skipped { reason } => (0, 0, reason.clone()),
            TrialOutcome::Failed { cause } => (0, 0, cause.clone()),
        };

        wtr.serialize(ReportRow {
            participant: trial.participant.label(),
            group: trial.participant.group.clone(),
            run: trial.run.clone(),
            status: outcome.status().to_string(),
            left_strides,
            right_strides,
            detail,
            processed_at: processed_at.clone(),
        })?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn run_extraction(config: &PipelineConfig) -> GaitResult<ExtractionReport> {
    config.validate()?;
    fs::create_dir_all(&config.output_root)?;

    let trials = enumerate_trials(
        &config.subset,
        &config.groups,
        config.max_participants,
        &config.runs,
    );

    log::info!(
        "Extracting strides for {} candidate trials on {} cores",
        trials.len(),
        num_cpus::get()
    );

    let start_time = std::time::Instant::now();

    // par_iter + collect keeps enumeration order
    let outcomes: Vec<(TrialId, TrialOutcome)> = trials
        .into_par_iter()
        .map(|trial| {
            let outcome = run_trial(&trial, config);
            (trial, outcome)
        })
        .collect();

    let tables = collect_stride_rows(&outcomes);
    remove_stale_tables(&outcomes, &tables, &config.output_root)?;

    let mut stride_tables = Vec::new();
    for (participant, rows) in tables {
        let path = participant.strides_file(&config.output_root);
        write_stride_table(&path, &rows)?;
        log::info!("Wrote {} stride rows to {}", rows.len(), path.display());
        stride_tables.push((participant, rows.len()));
    }

    write_report(&outcomes, &config.output_root.join("processing_report.csv"))?;

    let report = ExtractionReport {
        outcomes,
        stride_tables,
    };
    let counts = report.counts();
    log::info!(
        "Extraction finished in {:.2}s: {} processed, {} skipped, {} failed",
        start_time.elapsed().as_secs_f64(),
        counts.processed,
        counts.skipped,
        counts.failed
    );

    Ok(report)
}

pub fn print_extraction_summary(report: &ExtractionReport) {
    let counts = report.counts();

    println!("\n📊 STRIDE EXTRACTION SUMMARY");
    println!("============================");
    println!("  Processed trials: {}", counts.processed);
    println!("  Skipped trials:   {}", counts.skipped);
    println!("  Failed trials:    {}", counts.failed);
    println!("  Stride tables:    {}", report.stride_tables.len());

    let failures: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|(trial, outcome)| match outcome {
            TrialOutcome::Failed { cause } => Some((trial, cause)),
            _ => None,
        })
        .collect();

    if !failures.is_empty() {
        println!("\n⚠️  Failed trials:");
        for (trial, cause) in failures {
            println!("  {}: {}", trial, cause);
        }
    }
}

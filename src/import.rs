/// Reformat raw insole recordings into BIDS trial files.
///
/// Raw exports carry 19+ whitespace separated columns (time, per-sensor
/// pressures, total force per foot). Only time and the two total-force
/// columns are kept.

use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::error::GaitResult;
use crate::trial_io::{enumerate_trials, read_raw_recording, write_trial, TrialId};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportCounts {
    pub imported: usize,
    pub missing: usize,
    pub failed: usize,
}

fn import_trial(trial: &TrialId, config: &PipelineConfig) -> GaitResult<Option<usize>> {
    let raw_path = trial.raw_file(&config.raw_root);
    if !raw_path.is_file() {
        return Ok(None);
    }

    let signals = read_raw_recording(&raw_path, &config.raw_columns)?;
    let out_path = trial.trial_file(&config.input_root);
    write_trial(&out_path, &signals)?;

    log::debug!("{}: {} samples -> {}", trial, signals.len(), out_path.display());
    Ok(Some(signals.len()))
}

pub fn run_import(config: &PipelineConfig) -> GaitResult<ImportCounts> {
    config.validate()?;

    let trials = enumerate_trials(
        &config.subset,
        &config.groups,
        config.max_participants,
        &config.runs,
    );
    log::info!(
        "Importing raw recordings from {} into {}",
        config.raw_root.display(),
        config.input_root.display()
    );

    let results: Vec<(TrialId, GaitResult<Option<usize>>)> = trials
        .into_par_iter()
        .map(|trial| {
            let result = import_trial(&trial, config);
            (trial, result)
        })
        .collect();

    let mut counts = ImportCounts::default();
    for (trial, result) in results {
        match result {
            Ok(Some(_)) => counts.imported += 1,
            Ok(None) => counts.missing += 1,
            Err(e) => {
                log::warn!("{}: import failed: {}", trial, e);
                counts.failed += 1;
            }
        }
    }

    println!(
        "✅ Imported {} recordings ({} not present, {} failed)",
        counts.imported, counts.missing, counts.failed
    );
    Ok(counts)
}

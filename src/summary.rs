/// Per-participant and per-group stride time summary.

use std::path::{Path, PathBuf};

use csv::Writer;
use serde::Serialize;
use walkdir::WalkDir;

use crate::config::PipelineConfig;
use crate::error::{GaitError, GaitResult};
use crate::trial_io::{read_stride_table, strides_file_label, ParticipantId};

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantSummary {
    pub participant: ParticipantId,
    pub left_count: usize,
    pub right_count: usize,
    pub left_mean_s: Option<f64>,
    pub right_mean_s: Option<f64>,
}

/// A stride table that could not be read, and why.
#[derive(Debug)]
pub struct TableFailure {
    pub path: PathBuf,
    pub error: GaitError,
}

/// Readable tables summarized in group order, plus every table that failed.
#[derive(Debug, Default)]
pub struct SummaryReport {
    pub summaries: Vec<ParticipantSummary>,
    pub failures: Vec<TableFailure>,
}

#[derive(Debug, Serialize)]
struct SummaryRow {
    group: String,
    participant: String,
    left_strides: usize,
    right_strides: usize,
    left_mean_stride_s: Option<f64>,
    right_mean_stride_s: Option<f64>,
}

/// Mean of the present values; `None` when nothing is present.
fn mean_present(values: impl Iterator<Item = Option<f64>>) -> (usize, Option<f64>) {
    let (count, sum) = values
        .flatten()
        .filter(|v| v.is_finite())
        .fold((0usize, 0.0), |(n, s), v| (n + 1, s + v));
    if count == 0 {
        (0, None)
    } else {
        (count, Some(sum / count as f64))
    }
}

pub fn summarize_rows(participant: ParticipantId, rows: &[(Option<f64>, Option<f64>)]) -> ParticipantSummary {
    let (left_count, left_mean_s) = mean_present(rows.iter().map(|r| r.0));
    let (right_count, right_mean_s) = mean_present(rows.iter().map(|r| r.1));
    ParticipantSummary {
        participant,
        left_count,
        right_count,
        left_mean_s,
        right_mean_s,
    }
}

/// Stride tables under `output_root` that belong to the configured subset.
fn find_stride_tables(config: &PipelineConfig) -> Vec<(ParticipantId, PathBuf)> {
    WalkDir::new(&config.output_root)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.path().to_path_buf();
            let label = strides_file_label(&path)?;
            let participant = ParticipantId::parse(label, &config.subset, &config.groups)?;
            Some((participant, path))
        })
        .collect()
}

/// Summaries ordered by configured group order, then participant number.
///
/// A table that cannot be read is logged with its path and kept out of the
/// means; the other tables are still summarized.
pub fn summarize_participants(config: &PipelineConfig) -> SummaryReport {
    let mut report = SummaryReport::default();
    for (participant, path) in find_stride_tables(config) {
        match read_stride_table(&path) {
            Ok(rows) => report.summaries.push(summarize_rows(participant, &rows)),
            Err(error) => {
                log::warn!("{}: {}", path.display(), error);
                report.failures.push(TableFailure { path, error });
            }
        }
    }

    let group_rank = |group: &str| config.groups.iter().position(|g| g == group).unwrap_or(usize::MAX);
    report.summaries.sort_by(|a, b| {
        group_rank(a.participant.group.as_str())
            .cmp(&group_rank(b.participant.group.as_str()))
            .then(a.participant.number.cmp(&b.participant.number))
    });
    report.failures.sort_by(|a, b| a.path.cmp(&b.path));
    report
}

fn write_summary_csv(summaries: &[ParticipantSummary], output_path: &Path) -> GaitResult<()> {
    let mut wtr = Writer::from_path(output_path)?;
    for s in summaries {
        wtr.serialize(SummaryRow {
            group: s.participant.group.clone(),
            participant: s.participant.label(),
            left_strides: s.left_count,
            right_strides: s.right_count,
            left_mean_stride_s: s.left_mean_s,
            right_mean_stride_s: s.right_mean_s,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

fn format_mean(mean: Option<f64>) -> String {
    mean.map(|m| format!("{:.3}s", m)).unwrap_or_else(|| "   -  ".to_string())
}

pub fn print_group_summary(config: &PipelineConfig, summaries: &[ParticipantSummary]) {
    println!("\n📊 STRIDE TIME SUMMARY");
    println!("======================");

    for group in &config.groups {
        let members: Vec<_> = summaries.iter().filter(|s| &s.participant.group == group).collect();
        println!("\n{} group ({} participants):", group, members.len());
        if members.is_empty() {
            continue;
        }

        println!("  {:<10} {:>9} {:>9}", "ID", "Left", "Right");
        for s in &members {
            println!(
                "  {:<10} {:>9} {:>9}",
                s.participant.label(),
                format_mean(s.left_mean_s),
                format_mean(s.right_mean_s)
            );
        }

        let (_, left) = mean_present(members.iter().map(|s| s.left_mean_s));
        let (_, right) = mean_present(members.iter().map(|s| s.right_mean_s));
        println!("  {:<10} {:>9} {:>9}", "mean", format_mean(left), format_mean(right));
    }
}

fn print_table_failures(failures: &[TableFailure]) {
    if failures.is_empty() {
        return;
    }
    println!("\n⚠️  Unreadable stride tables:");
    for failure in failures {
        println!("  {}: {}", failure.path.display(), failure.error);
    }
}

pub fn run_summary(config: &PipelineConfig) -> GaitResult<SummaryReport> {
    config.validate()?;

    let report = summarize_participants(config);
    print_table_failures(&report.failures);
    if report.summaries.is_empty() {
        log::warn!("No readable stride tables found in {}", config.output_root.display());
        return Ok(report);
    }

    let output_path = config.output_root.join("group_stride_summary.csv");
    write_summary_csv(&report.summaries, &output_path)?;
    print_group_summary(config, &report.summaries);
    println!("\n📁 Summary saved to: {}", output_path.display());

    Ok(report)
}

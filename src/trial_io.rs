/// Trial naming and tab-separated table I/O.
///
/// Layout on disk follows BIDS:
///   <input_root>/sub-GaCo01/beh/sub-GaCo01_run-01_task-gait_beh.tsv
///   <output_root>/sub-GaCo01_strides.tsv

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Terminator, Writer, WriterBuilder};

use crate::config::ColumnLayout;
use crate::error::{GaitError, GaitResult};
use crate::signal::{Limb, TrialSignals};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId {
    pub subset: String,
    pub group: String,
    pub number: u32,
}

impl ParticipantId {
    pub fn new(subset: &str, group: &str, number: u32) -> Self {
        ParticipantId {
            subset: subset.to_string(),
            group: group.to_string(),
            number,
        }
    }

    /// e.g. `GaCo01`
    pub fn label(&self) -> String {
        format!("{}{}{:02}", self.subset, self.group, self.number)
    }

    /// Split a label back into subset, group and number using the known
    /// subset and group codes.
    pub fn parse(label: &str, subset: &str, groups: &[String]) -> Option<Self> {
        let rest = label.strip_prefix(subset)?;
        groups.iter().find_map(|group| {
            let digits = rest.strip_prefix(group.as_str())?;
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let number = digits.parse().ok()?;
            Some(ParticipantId::new(subset, group, number))
        })
    }

    pub fn strides_file(&self, output_root: &Path) -> PathBuf {
        output_root.join(format!("sub-{}_strides.tsv", self.label()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrialId {
    pub participant: ParticipantId,
    pub run: String,
}

impl TrialId {
    pub fn new(participant: ParticipantId, run: &str) -> Self {
        TrialId {
            participant,
            run: run.to_string(),
        }
    }

    pub fn trial_file(&self, input_root: &Path) -> PathBuf {
        let label = self.participant.label();
        input_root
            .join(format!("sub-{}", label))
            .join("beh")
            .join(format!("sub-{}_run-{}_task-gait_beh.tsv", label, self.run))
    }

    pub fn raw_file(&self, raw_root: &Path) -> PathBuf {
        raw_root.join(format!("{}_{}.txt", self.participant.label(), self.run))
    }
}

impl std::fmt::Display for TrialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}_run-{}", self.participant.label(), self.run)
    }
}

/// Every subset/group/participant/run combination, in enumeration order.
pub fn enumerate_trials(subset: &str, groups: &[String], max_participants: u32, runs: &[String]) -> Vec<TrialId> {
    let mut trials = Vec::new();
    for group in groups {
        for number in 1..=max_participants {
            let participant = ParticipantId::new(subset, group, number);
            for run in runs {
                trials.push(TrialId::new(participant.clone(), run));
            }
        }
    }
    trials
}

/// Participant label encoded in a `sub-<ID>_strides.tsv` file name.
pub fn strides_file_label(path: &Path) -> Option<&str> {
    path.file_name()?
        .to_str()?
        .strip_prefix("sub-")?
        .strip_suffix("_strides.tsv")
}

fn parse_field(field: &str, line: usize) -> GaitResult<f64> {
    let field = field.trim();
    if field.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    field.parse::<f64>().map_err(|_| GaitError::Parse {
        line,
        value: field.to_string(),
    })
}

fn pick_columns(fields: &[&str], columns: &ColumnLayout, line: usize) -> GaitResult<(f64, f64, f64)> {
    let needed = columns.width();
    if fields.len() < needed {
        return Err(GaitError::TooFewColumns {
            line,
            needed,
            found: fields.len(),
        });
    }
    Ok((
        parse_field(fields[columns.time], line)?,
        parse_field(fields[columns.left], line)?,
        parse_field(fields[columns.right], line)?,
    ))
}

fn signals_from_rows(rows: Vec<(f64, f64, f64)>) -> GaitResult<TrialSignals> {
    let mut time = Vec::with_capacity(rows.len());
    let mut left = Vec::with_capacity(rows.len());
    let mut right = Vec::with_capacity(rows.len());
    for (t, l, r) in rows {
        time.push(t);
        left.push(l);
        right.push(r);
    }
    TrialSignals::new(time, left, right)
}

/// Physical line a record starts on; the reader skips blank lines.
fn record_line(record: &StringRecord) -> usize {
    record.position().map_or(0, |p| p.line() as usize)
}

/// Tab-separated, headerless, `\n` terminated.
fn tsv_writer(path: &Path) -> GaitResult<Writer<File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let wtr = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_path(path)?;
    Ok(wtr)
}

/// Read a headerless tab-separated trial file.
pub fn read_trial(path: &Path, columns: &ColumnLayout) -> GaitResult<TrialSignals> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    while rdr.read_record(&mut record)? {
        let line = record_line(&record);
        let fields: Vec<&str> = record.iter().collect();
        if fields.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        rows.push(pick_columns(&fields, columns, line)?);
    }

    signals_from_rows(rows)
}

/// Read a raw whitespace-delimited recording as exported by the insoles.
pub fn read_raw_recording(path: &Path, columns: &ColumnLayout) -> GaitResult<TrialSignals> {
    let reader = BufReader::new(File::open(path)?);

    let mut rows = Vec::new();
    for (i, text) in reader.lines().enumerate() {
        let text = text?;
        let fields: Vec<&str> = text.split_whitespace().collect();
        if fields.is_empty() || fields[0].starts_with('#') {
            continue;
        }
        rows.push(pick_columns(&fields, columns, i + 1)?);
    }

    signals_from_rows(rows)
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.6}", v),
        _ => "NaN".to_string(),
    }
}

/// Write `time left right` columns, creating parent directories.
pub fn write_trial(path: &Path, signals: &TrialSignals) -> GaitResult<()> {
    let mut wtr = tsv_writer(path)?;

    let time = signals.time();
    let left = signals.force(Limb::Left);
    let right = signals.force(Limb::Right);
    for i in 0..signals.len() {
        wtr.write_record(&[
            format!("{:.6}", time[i]),
            format!("{:.6}", left[i]),
            format!("{:.6}", right[i]),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write (left, right) stride rows; missing entries become `NaN`.
pub fn write_stride_table(path: &Path, rows: &[(Option<f64>, Option<f64>)]) -> GaitResult<()> {
    let mut wtr = tsv_writer(path)?;
    for (left, right) in rows {
        wtr.write_record(&[format_value(*left), format_value(*right)])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a stride table back; `NaN` entries become `None`.
pub fn read_stride_table(path: &Path) -> GaitResult<Vec<(Option<f64>, Option<f64>)>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let as_option = |v: f64| if v.is_nan() { None } else { Some(v) };

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record_line(&record);
        if record.len() < 2 {
            return Err(GaitError::TooFewColumns {
                line,
                needed: 2,
                found: record.len(),
            });
        }
        let left = parse_field(&record[0], line)?;
        let right = parse_field(&record[1], line)?;
        rows.push((as_option(left), as_option(right)));
    }
    Ok(rows)
}

use thiserror::Error;

/// Errors raised while loading, validating or processing gait trials.
#[derive(Error, Debug)]
pub enum GaitError {
    #[error("signal is empty")]
    EmptySignal,

    #[error("time axis has {time} samples but force channel has {force}")]
    LengthMismatch { time: usize, force: usize },

    #[error("time axis is not strictly increasing at sample {index}")]
    NonMonotonicTime { index: usize },

    #[error("non-finite value at sample {index}")]
    NonFiniteSample { index: usize },

    #[error("line {line}: expected at least {needed} columns, found {found}")]
    TooFewColumns { line: usize, needed: usize, found: usize },

    #[error("line {line}: cannot parse '{value}' as a number")]
    Parse { line: usize, value: String },

    #[error("negative stride interval {interval} at contact {index}, contacts are out of order")]
    StrideOrder { index: usize, interval: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type GaitResult<T> = Result<T, GaitError>;

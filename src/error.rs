use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::Stage;

#[derive(Debug, Error)]
pub enum CleanError {
    #[error("Row {row} ({company}): cannot parse date '{value}' with format '{format}'")]
    MalformedDate {
        row: usize,
        company: String,
        value: String,
        format: String,
    },

    #[error("Row {row}: column '{column}' holds '{value}', expected a non-negative number")]
    MalformedNumber {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("Constraint violated after {stage} at row {row}: {detail}")]
    ConstraintViolation {
        stage: Stage,
        row: usize,
        detail: String,
    },

    #[error("I/O failure during {stage} on {path:?}: {source}")]
    Io {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV failure during {stage}: {source}")]
    Csv {
        stage: Stage,
        #[source]
        source: csv::Error,
    },

    #[error("Input is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Column '{column}' cannot be used for {purpose}")]
    UnsupportedColumn {
        column: &'static str,
        purpose: &'static str,
    },

    #[error("Invalid canonicalization rule for '{column}': {detail}")]
    InvalidRule {
        column: &'static str,
        detail: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CleanError {
    pub fn io(stage: Stage, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CleanError::Io {
            stage,
            path: path.into(),
            source,
        }
    }

    pub fn csv(stage: Stage, source: csv::Error) -> Self {
        CleanError::Csv { stage, source }
    }

    /// Stage the failure belongs to, when the error is tied to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            CleanError::MalformedDate { .. } => Some(Stage::ParseDates),
            CleanError::MalformedNumber { .. } => Some(Stage::Load),
            CleanError::ConstraintViolation { stage, .. }
            | CleanError::Io { stage, .. }
            | CleanError::Csv { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CleanError>;

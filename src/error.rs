use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid duration band {name}: min {min} must not exceed max {max}")]
    InvalidDurationBand { name: String, min: i64, max: i64 },

    #[error("Duration bands {first} and {second} overlap")]
    OverlappingDurationBands { first: String, second: String },

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Why a company produced no periods. Skips are outcomes, not failures: a batch
/// keeps going and the caller decides what to do with them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("Missing structure: {path} not found")]
    MissingStructure { path: String },

    #[error("No qualifying filings among {inspected} anchor entries")]
    NoQualifyingFilings { inspected: usize },
}

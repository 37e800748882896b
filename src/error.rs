use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Invalid audit period: start {start} is after end {end}")]
    InvalidPeriod { start: String, end: String },

    #[error("Invalid date '{value}' in {record}")]
    InvalidDate { record: String, value: String },

    #[error("Invalid year-month key '{0}': expected YYYY-MM")]
    InvalidYearMonth(String),

    #[error("Unknown energy type '{value}' in {record}")]
    UnknownEnergyType { record: String, value: String },

    #[error("Invalid value for '{field}' in {record}: {details}")]
    InvalidValue {
        record: String,
        field: String,
        details: String,
    },

    #[error("Invalid margin fraction {0}: must be a finite value >= 0.0")]
    InvalidMarginFraction(f64),

    #[error("Invalid trim fraction {0}: must be between 0.0 and 0.5")]
    InvalidTrimFraction(f64),

    #[error("Rollup inconsistency at {level}: {details}")]
    RollupInconsistency { level: String, details: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AuditError>;

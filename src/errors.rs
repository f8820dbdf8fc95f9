use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("column '{0}' is missing from the header row")]
    MissingColumn(String),

    #[error("invalid reporting period '{0}', expected YYYY-MM")]
    InvalidPeriod(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("routing table '{table}' lists '{key}' more than once")]
    DuplicateRoutingKey { table: String, key: String },

    #[error("sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("summary row {row} is unusable: {reason}")]
    InvalidSummaryRow { row: usize, reason: String },

    #[error("value overflow")]
    ValueOverflow,
}

use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarmonizeError {
    #[error("Failed processing DataFrame: {0}")]
    DataFrame(#[from] PolarsError),

    #[error("Required column '{0}' not found in weather table")]
    MissingColumn(String),

    #[error("Expected exactly one data column next to '{time}', found {found:?}")]
    AmbiguousDataColumn { time: String, found: Vec<String> },

    #[error("Year {0} is outside the supported calendar range")]
    InvalidYear(i32),
}

use thiserror::Error;

/// Main error type for sheet queries.
/// Aggregates errors from dependencies, the store and internal modules.
#[derive(Error, Debug)]
pub enum SheetQueryError {
    #[error("{0}")]
    WithContextError(String),

    #[error("{0}")]
    AnyhowError(#[from] anyhow::Error),

    // Third-party library errors
    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    // Store errors
    #[error("{0}")]
    StoreError(#[from] crate::store::StoreError),

    #[error("Max retries ({retries}) reached for store call. Last error: {message}")]
    RetryExhausted { retries: u32, message: String },

    #[error("Store rejected write to table \"{table}\" ({}): {message}", ranges.join(", "))]
    WriteRejected {
        table: String,
        ranges: Vec<String>,
        message: String,
    },

    #[error("Table \"{0}\" not found or has no headers")]
    MissingHeaderRow(String),

    // Database module errors
    #[error("{0}")]
    RangeError(#[from] crate::database::range::RangeError),

    #[error("{0}")]
    ColumnError(#[from] crate::database::column::ColumnError),

    // Configuration errors
    #[error("{0}")]
    ConfigError(#[from] crate::config::ConfigError),
}

impl SheetQueryError {
    /// Returns true when the error came from an exhausted retry loop.
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, SheetQueryError::RetryExhausted { .. })
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, SheetQueryError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| SheetQueryError::WithContextError(format!("{}: {}", message, e)))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::*;
    use crate::store::StoreError;

    #[test]
    fn prefix_wraps_message() {
        let result: Result<(), SheetQueryError> = Err(StoreError::Remote("boom".to_owned()).into());
        let error = result.with_prefix("Failed to read table \"People\"").unwrap_err();
        assert_eq!(error.to_string(), "Failed to read table \"People\": boom");
    }

    #[test]
    fn callback_errors_convert() {
        fn failing() -> Result<(), SheetQueryError> {
            Err(anyhow::anyhow!("resolver gave up"))?
        }
        assert_eq!(failing().unwrap_err().to_string(), "resolver gave up");
    }

    #[test]
    fn write_rejected_names_ranges() {
        let error = SheetQueryError::WriteRejected {
            table: "Tasks".to_owned(),
            ranges: vec!["Tasks!B2:B4".to_owned(), "Tasks!B7:B7".to_owned()],
            message: "protected range".to_owned(),
        };
        assert_eq!(
            error.to_string(),
            "Store rejected write to table \"Tasks\" (Tasks!B2:B4, Tasks!B7:B7): protected range"
        );
    }

    #[test]
    fn retry_exhausted_carries_last_message() {
        let error = SheetQueryError::RetryExhausted {
            retries: 16,
            message: "429 Rate Limit Exceeded: slow down".to_owned(),
        };
        assert!(error.is_retry_exhausted());
        assert!(error.to_string().contains("slow down"));
    }
}

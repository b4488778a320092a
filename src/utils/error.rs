use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Parquet decoding failed: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("No input file for {platform} (looked for {candidates})")]
    MissingInputError {
        platform: String,
        candidates: String,
    },

    #[error("Column '{column}' not found in {table} data")]
    MissingColumnError { table: String, column: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Input,
    Data,
    Configuration,
    Serialization,
    Archive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn processing(message: impl Into<String>) -> Self {
        EtlError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        EtlError::MissingColumnError {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::IoError(_) => ErrorCategory::Io,
            EtlError::ParquetError(_) | EtlError::MissingInputError { .. } => {
                ErrorCategory::Input
            }
            EtlError::CsvError(_)
            | EtlError::MissingColumnError { .. }
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            EtlError::SerializationError(_) => ErrorCategory::Serialization,
            EtlError::ZipError(_) => ErrorCategory::Archive,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Archive => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Data | ErrorCategory::Serialization => {
                ErrorSeverity::High
            }
            ErrorCategory::Configuration | ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::MissingInputError { .. } => {
                "Place meta, snapchat, tiktok and youtube exports (.parquet or .csv) in the data directory"
            }
            EtlError::MissingColumnError { .. } => {
                "Check that the platform export contains the expected column names"
            }
            EtlError::ParquetError(_) => {
                "Re-export the file; it may be truncated or not a parquet file"
            }
            EtlError::CsvError(_) => {
                "Check the CSV file for malformed rows or inconsistent column counts"
            }
            EtlError::ProcessingError { .. } => "Inspect the offending values in the source export",
            EtlError::IoError(_) => {
                "Check that the data and output directories exist and are writable"
            }
            EtlError::ZipError(_) => "Disable the report bundle or free disk space and retry",
            EtlError::SerializationError(_) => "Report this as a bug together with the input data",
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => {
                "Fix the configuration file or command line flags and retry"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Input => format!("Could not read input data: {}", self),
            ErrorCategory::Data => format!("Input data could not be processed: {}", self),
            ErrorCategory::Io => format!("File system error: {}", self),
            ErrorCategory::Serialization | ErrorCategory::Archive => {
                format!("Could not write reports: {}", self)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_is_high_severity_data_error() {
        let err = EtlError::missing_column("TikTok", "clicks");
        assert_eq!(err.category(), ErrorCategory::Data);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.to_string(), "Column 'clicks' not found in TikTok data");
    }

    #[test]
    fn test_config_errors_are_critical() {
        let err = EtlError::ConfigError {
            message: "paths.data_dir is not set".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().starts_with("Invalid configuration"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: EtlError = io.into();
        assert_eq!(err.category(), ErrorCategory::Io);
    }
}

//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

use hclift_convert::ConvertError;
use hclift_core::CoreError;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// The template could not be decoded
    #[error("Invalid template: {message}")]
    #[diagnostic(code(hclift::cli::template))]
    InvalidTemplate {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Conversion aborted
    #[error("Conversion failed: {message}")]
    #[diagnostic(code(hclift::cli::convert))]
    Conversion {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Refusing to overwrite an existing file
    #[error("Output file already exists: {path}")]
    #[diagnostic(code(hclift::cli::output), help("Use --force to overwrite it"))]
    OutputExists { path: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(hclift::cli::io))]
    Io { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidTemplate { .. } => exit_codes::INVALID_TEMPLATE,
            CliError::Conversion { .. } => exit_codes::CONVERSION_ERROR,
            CliError::OutputExists { .. } => exit_codes::ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
        }
    }

    /// Create an output-exists error
    pub fn output_exists(path: &Path) -> Self {
        Self::OutputExists {
            path: path.display().to_string(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(e) => e.into(),
            CoreError::JsonParse(e) => CliError::InvalidTemplate {
                message: e.to_string(),
                help: Some("The template must be a JSON object with a \"builders\" list".to_string()),
            },
            other => CliError::InvalidTemplate {
                message: other.to_string(),
                help: None,
            },
        }
    }
}

impl From<ConvertError> for CliError {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::Template(e) => e.into(),
            ConvertError::Io(e) => e.into(),
            unknown @ ConvertError::UnknownBuilder { .. } => CliError::Conversion {
                message: unknown.to_string(),
                help: Some("Pass --allow-builder <TYPE> to accept a plugin builder".to_string()),
            },
            other => CliError::Conversion {
                message: other.to_string(),
                help: None,
            },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let err = CliError::from(ConvertError::UnknownBuilder {
            builder_type: "nope".into(),
            name: "x".into(),
        });
        assert_eq!(err.exit_code(), exit_codes::CONVERSION_ERROR);

        let err = CliError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.exit_code(), exit_codes::IO_ERROR);

        let err = CliError::output_exists(Path::new("out.pkr.hcl"));
        assert_eq!(err.exit_code(), exit_codes::ERROR);
    }

    #[test]
    fn test_core_errors_map_to_invalid_template() {
        let json_err = hclift_core::Template::from_json("{").unwrap_err();
        assert_eq!(CliError::from(json_err).exit_code(), exit_codes::INVALID_TEMPLATE);

        let invalid = hclift_core::Template::from_json("{}").unwrap_err();
        let err = CliError::from(ConvertError::Template(invalid));
        assert_eq!(err.exit_code(), exit_codes::INVALID_TEMPLATE);
    }
}

//! Error and warning types for the converter
//!
//! Fatal conditions abort the run with a [`ConvertError`]. Everything that
//! goes wrong inside a single fragment is a [`CallError`], recovered locally
//! and surfaced as a [`ConversionWarning`].

use thiserror::Error;

use crate::parser::ParseError;
use crate::registry::Unconvertible;

/// Converter error
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Unknown builder type \"{builder_type}\" for builder \"{name}\"")]
    UnknownBuilder { builder_type: String, name: String },

    #[error("Failed to decode source_ami_filter of builder \"{builder}\": expected an object, got {found}")]
    FilterDecode { builder: String, found: &'static str },

    #[error("Failed to load template: {0}")]
    Template(#[from] hclift_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Failure while reinterpreting one fragment
///
/// Messages follow the legacy engine's wording since they end up verbatim in
/// the generated comments.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("function \"{0}\" not defined")]
    UndefinedFunction(String),

    #[error("wrong number of args for {call}: want {expected} got {found}")]
    WrongArgCount {
        call: String,
        expected: String,
        found: usize,
    },

    #[error("wrong type for value of argument {position} of {call}; expected {expected}; got {found}")]
    WrongArgType {
        call: String,
        position: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("can't evaluate field {0}")]
    UnknownField(String),

    #[error(
        "unhandled {:?} call:\n# there is no way to automatically upgrade the {:?} call.\n# Please manually upgrade to {}\n# Visit {} for more infos.",
        .0.call,
        .0.call,
        .0.correspondence,
        .0.docs
    )]
    Unhandled(Unconvertible),
}

impl CallError {
    /// Comment placed in front of a fragment that could not be rewritten
    pub fn fallback_comment(&self) -> String {
        match self {
            CallError::Unhandled(_) => format!("\n# {}\n", self),
            other => format!(
                "\n# could not parse template for following block: {:?}\n",
                other.to_string()
            ),
        }
    }
}

// =============================================================================
// WARNING SYSTEM
// =============================================================================

/// Warning severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WarningSeverity {
    /// Informational - conversion succeeded, the output shape changed
    Info,
    /// Warning - a block was left as-is and needs review
    Warning,
    /// Unsupported - call has no automatic upgrade, alternative provided
    Unsupported,
}

impl WarningSeverity {
    /// Get the emoji icon for this severity
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Info => "ℹ",
            Self::Warning => "⚠",
            Self::Unsupported => "✗",
        }
    }

    /// Get the label for this severity
    pub fn label(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Warning category for grouping related warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WarningCategory {
    /// Fragment could not be parsed or evaluated
    Syntax,
    /// Legacy call without an HCL2 counterpart
    UnsupportedCall,
    /// Datasource generated in place of a declaration
    Datasource,
}

impl WarningCategory {
    /// Get the display label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::UnsupportedCall => "unsupported",
            Self::Datasource => "datasource",
        }
    }
}

/// Rich warning with context and alternatives
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionWarning {
    pub severity: WarningSeverity,
    pub category: WarningCategory,
    /// Section of the output the warning belongs to, e.g. `source "docker" "web"`
    pub section: String,
    /// The legacy construct that triggered the warning
    pub pattern: String,
    pub message: String,
    /// Suggested alternative or fix
    pub suggestion: Option<String>,
    pub doc_link: Option<String>,
}

impl ConversionWarning {
    /// Create an info-level warning
    pub fn info(section: &str, pattern: &str, message: &str) -> Self {
        Self {
            severity: WarningSeverity::Info,
            category: WarningCategory::Datasource,
            section: section.to_string(),
            pattern: pattern.to_string(),
            message: message.to_string(),
            suggestion: None,
            doc_link: None,
        }
    }

    /// Create a warning-level warning
    pub fn warning(section: &str, pattern: &str, message: &str) -> Self {
        Self {
            severity: WarningSeverity::Warning,
            category: WarningCategory::Syntax,
            section: section.to_string(),
            pattern: pattern.to_string(),
            message: message.to_string(),
            suggestion: None,
            doc_link: None,
        }
    }

    /// Create an unsupported call warning
    pub fn unsupported(section: &str, pattern: &str, alternative: &str) -> Self {
        Self {
            severity: WarningSeverity::Unsupported,
            category: WarningCategory::UnsupportedCall,
            section: section.to_string(),
            pattern: pattern.to_string(),
            message: format!("'{}' cannot be upgraded automatically", pattern),
            suggestion: Some(alternative.to_string()),
            doc_link: None,
        }
    }

    /// Add suggestion to warning
    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }

    /// Add documentation link
    pub fn with_doc_link(mut self, url: &str) -> Self {
        self.doc_link = Some(url.to_string());
        self
    }
}

impl std::fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: [severity] section - message
        write!(f, "[{}] {} - {}", self.severity.label(), self.section, self.message)?;

        if let Some(ref suggestion) = self.suggestion {
            write!(f, "\n  {} {}", self.severity.icon(), suggestion)?;
        }

        if let Some(ref link) = self.doc_link {
            write!(f, "\n  See: {}", link)?;
        }

        Ok(())
    }
}

/// Factory functions for the warnings the converter raises
pub mod warnings {
    use super::*;

    /// A fragment whose rewrite failed, by cause
    pub fn fragment_fallback(section: &str, error: &CallError) -> ConversionWarning {
        match error {
            CallError::Unhandled(u) => {
                ConversionWarning::unsupported(section, u.call, u.correspondence).with_doc_link(u.docs)
            }
            other => ConversionWarning::warning(
                section,
                "{{ ... }}",
                &format!("block left unconverted: {}", other),
            )
            .with_suggestion("Review the commented block and upgrade it by hand"),
        }
    }

    /// A variable replaced by a secret datasource
    pub fn variable_promoted(variable: &str) -> ConversionWarning {
        ConversionWarning::info(
            &format!("variable \"{}\"", variable),
            "aws_secretsmanager",
            &format!(
                "variable '{}' replaced by data \"amazon-secretsmanager\" \"{}\"",
                variable, variable
            ),
        )
        .with_doc_link("https://www.packer.io/docs/datasources/amazon/secretsmanager")
    }
}

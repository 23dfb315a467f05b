//! hclift Convert - legacy JSON build templates to HCL2
//!
//! This crate turns a decoded legacy template into an HCL2 configuration.
//! Component settings are transcoded into blocks and attributes, and legacy
//! `{{ ... }}` calls embedded in strings are rewritten into HCL2 expressions:
//!
//! | Legacy call                              | HCL2                                        |
//! |------------------------------------------|---------------------------------------------|
//! | `{{ user "region" }}`                    | `${var.region}`                             |
//! | `{{ timestamp }}`                        | `${local.timestamp}`                        |
//! | `{{ env "HOME" }}`                       | `${env("HOME")}`                            |
//! | `{{ template_dir }}`                     | `${path.root}`                              |
//! | `{{ aws_secretsmanager "db" "pw" }}`     | `${data.amazon-secretsmanager.db_pw.value}` |
//!
//! Identical secret lookups and identical `source_ami_filter` settings share
//! one generated datasource.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use hclift_convert::{ConvertOptions, Converter, WarningSeverity};
//!
//! let converter = Converter::new(ConvertOptions::default());
//! let result = converter.convert_file(Path::new("template.json")).unwrap();
//!
//! std::fs::write("template.json.pkr.hcl", &result.output).unwrap();
//!
//! for warning in &result.warnings {
//!     if warning.severity == WarningSeverity::Unsupported {
//!         println!("Unsupported: {} - {}", warning.pattern, warning.message);
//!         if let Some(ref suggestion) = warning.suggestion {
//!             println!("  Alternative: {}", suggestion);
//!         }
//!     }
//! }
//! ```
//!
//! # Unconvertible Calls
//!
//! `lower`, `upper`, `split`, `replace`, `replace_all` and
//! `clean_resource_name` have no automatic upgrade. The section using them is
//! kept as-is behind a comment naming the HCL2 function to use instead.

pub mod ast;
pub mod body;
pub mod builders;
pub mod converter;
pub mod datasource;
pub mod error;
pub mod parser;
pub mod registry;
pub mod reinterpret;
pub mod transcode;

// Re-exports
pub use builders::{BuilderRegistry, KnownBuilders};
pub use converter::{ConversionResult, ConvertOptions, Converter, convert, convert_with_options};
pub use datasource::Datasources;
pub use error::{
    CallError, ConversionWarning, ConvertError, Result, WarningCategory, WarningSeverity,
};
pub use reinterpret::{Mode, Reinterpreted, reinterpret};
pub use transcode::transcode;

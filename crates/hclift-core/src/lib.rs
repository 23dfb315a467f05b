//! hclift Core - legacy JSON build templates
//!
//! This crate provides the foundational types used throughout hclift:
//! - `Value`: the decoded, untyped JSON tree of component settings
//! - `Template`: builders, provisioners, post-processors and variables
//! - `format_duration`: durations spelled the way the legacy tool prints them

pub mod duration;
pub mod error;
pub mod template;
pub mod value;

pub use duration::format_duration;
pub use error::{CoreError, Result};
pub use template::{Builder, PostProcessor, Provisioner, Template, Variable};
pub use value::{Mapping, Value};

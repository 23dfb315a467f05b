//! CLI commands

pub mod calls;
pub mod upgrade;

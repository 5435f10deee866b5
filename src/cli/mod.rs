//! CLI argument parsing and command dispatch.

pub mod accounts;
pub mod args;
pub mod quota;

pub use args::{Cli, Commands, OutputFormat};

//! longread CLI library
//!
//! Command parsing, configuration loading and command handlers for the
//! `longread` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::{Cli, Commands};
pub use config::{AppConfig, PlatformConfig};
pub use error::{CliError, Result};

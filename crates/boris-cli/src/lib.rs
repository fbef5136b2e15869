//! BORIS command-line library.
//!
//! This crate provides the CLI interface over `boris-core`: project files,
//! configuration and the subcommands.

mod cli;
pub mod commands;
mod config;
pub mod project;

pub use cli::{Cli, CodeArgs, Commands, PositionArgs};
pub use config::Config;
pub use project::{Observation, Project};

//! CLI subcommand implementations.

pub mod check;
pub mod edit;
pub mod kappa;
pub mod states;
pub mod util;

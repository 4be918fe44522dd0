//! CLI command implementations.

pub mod args;
pub mod migrate;
pub mod output;

pub use args::{Cli, Commands};
pub use output::Output;

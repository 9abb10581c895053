//! CLI-specific functionality: argument parsing and command handlers.
//!
//! The binary is a reference caller of the pipeline; all policy lives in the
//! library.

pub mod args;
pub mod commands;

pub use args::{Args, Commands, FormatArg};

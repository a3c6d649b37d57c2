//! Command handlers for CLI subcommands
//!
//! This module contains the implementation logic for each CLI subcommand.

mod completions;
mod describe;
mod utils;
mod validate;

pub use completions::handle_completions;
pub use describe::handle_describe;
pub use validate::handle_validate;

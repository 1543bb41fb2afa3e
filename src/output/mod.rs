//! Output module for emitting harvest results
//!
//! This module handles:
//! - Writing rendered article outcomes as they arrive
//! - Formatting end-of-run statistics

pub mod stats;

pub use stats::{format_report, print_report, RunReport};

use crate::crawler::ArticleOutcome;
use std::io::Write;

/// Line printed between two rendered outcomes
pub const SEPARATOR: &str = "----------------------------------------";

/// Writes one outcome followed by a separator line
pub fn write_outcome<W: Write>(writer: &mut W, outcome: &ArticleOutcome) -> std::io::Result<()> {
    writeln!(writer, "{}", outcome.url())?;
    writeln!(writer, "{}", outcome.render())?;
    writeln!(writer, "{}", SEPARATOR)?;
    Ok(())
}

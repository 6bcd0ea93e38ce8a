//! Type definitions for Idea Council
//!
//! This module contains the data model shared by the persona evaluator and
//! the orchestrator: evaluation input, persona signals and the consolidated
//! evaluation.

mod evaluation;
mod input;
mod signal;

pub use evaluation::*;
pub use input::*;
pub use signal::*;

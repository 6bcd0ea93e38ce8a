//! Structured-call layer
//!
//! Turns a prompt plus an optional output schema into a validated JSON value:
//! best-effort JSON recovery, bounded retries with backoff, and type-driven
//! defaults when the model never produces a usable answer.

mod caller;
mod extract;
mod schema;

pub use caller::{CallOutcome, RetryPolicy, StructuredCaller};
pub use extract::{extract_balanced, extract_code_block, parse_json};
pub use schema::{placeholder_text, FieldKind, FieldSpec, OutputSchema, Repaired};

//! idea-council - multi-persona evaluation of product ideas
//!
//! A council of LLM-backed expert personas scores an idea independently;
//! the orchestrator merges their signals into shared score buckets and a
//! privileged advisor turns the aggregate into a go/no-go recommendation.
//!
//! ```no_run
//! use std::sync::Arc;
//! use parking_lot::RwLock;
//! use idea_council::{
//!     BackendFactory, BackendSettings, EvaluationInput, Orchestrator, PersonaEvaluator,
//!     PersonaRegistry, RetryPolicy, StructuredCaller,
//! };
//!
//! # async fn run() -> idea_council::Result<()> {
//! let backend = BackendFactory::connect(&BackendSettings::default()).await?;
//! let caller = StructuredCaller::new(backend, RetryPolicy::default());
//! let registry = Arc::new(RwLock::new(PersonaRegistry::bundled()?));
//!
//! let council = Orchestrator::new(PersonaEvaluator::new(caller), registry);
//! let input = EvaluationInput::new("A marketplace for idle GPU time")?;
//! let evaluation = council.evaluate(input, None).await?;
//! println!("overall: {:.2}", evaluation.overall_score);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod persona;
pub mod report;
pub mod structured;
pub mod types;

pub use backend::{BackendFactory, BackendKind, BackendSettings, ModelBackend, SharedBackend};
pub use config::AppConfig;
pub use error::{Error, ErrorCode, Result};
pub use orchestrator::{Orchestrator, OrchestratorOptions};
pub use persona::{PersonaConfig, PersonaEvaluator, PersonaRegistry};
pub use structured::{OutputSchema, RetryPolicy, StructuredCaller};
pub use types::{ContextBlock, EvaluationInput, ScoreBucket, UnifiedEvaluation};

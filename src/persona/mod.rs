//! Persona system: catalog, persisted settings and the evaluation pipeline.
//!
//! Personas are independently prompted expert viewpoints. The bundled catalog
//! defines what each one analyzes and how its scores are routed; the registry
//! tracks which personas are enabled and in what priority.

pub mod evaluator;
pub mod registry;
pub mod types;

pub use evaluator::{AdvisorBrief, PersonaEvaluator};
pub use registry::PersonaRegistry;
pub use types::{
    PersonaBlueprint, PersonaCatalog, PersonaConfig, PersonaSettings, ScoreSpec, TopicSpec,
};

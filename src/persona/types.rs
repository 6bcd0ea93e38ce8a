//! Core types for the persona system.
//!
//! A persona is defined by an immutable blueprint from the bundled catalog
//! (topics, score routing, output lists) plus mutable settings (enabled,
//! priority) that are persisted between runs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::structured::OutputSchema;
use crate::types::{ContextBlock, ScoreBucket};

/// Wire name of the free-text rationale field
pub const RATIONALE_FIELD: &str = "reasoning";

// ─────────────────────────────────────────────────────────────────
// Blueprint (loaded from TOML)
// ─────────────────────────────────────────────────────────────────

/// One sub-analysis a persona runs before its synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSpec {
    /// Evidence key in the synthesis prompt.
    pub key: String,

    /// Instruction heading, e.g. "Analyze the market opportunity".
    pub title: String,

    /// Context block inlined into the prompt, if any.
    #[serde(default)]
    pub context: Option<ContextBlock>,

    /// Points the analysis must cover.
    #[serde(default)]
    pub considerations: Vec<String>,
}

/// A declared score and the bucket it is averaged into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSpec {
    pub name: String,
    pub description: String,
    pub bucket: ScoreBucket,
}

/// Bundled, immutable definition of a persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaBlueprint {
    pub id: String,
    pub name: String,
    pub description: String,

    /// Default priority (lower sorts first).
    pub priority: i32,

    /// The final advisor: always enabled, runs last.
    #[serde(default)]
    pub privileged: bool,

    /// Areas of expertise reported to the advisor.
    #[serde(default)]
    pub expertise: Vec<String>,

    /// Name of the list merged into the evaluation's insights.
    #[serde(default)]
    pub insight_list: Option<String>,

    /// Name of the list merged into the evaluation's risks.
    #[serde(default)]
    pub risk_list: Option<String>,

    /// Extra instructions prepended to the synthesis prompt.
    #[serde(default)]
    pub guidance: Option<String>,

    #[serde(default, rename = "topic")]
    pub topics: Vec<TopicSpec>,

    #[serde(default, rename = "score")]
    pub scores: Vec<ScoreSpec>,
}

impl PersonaBlueprint {
    /// Schema of the synthesis call: scores, rationale, insight and risk lists.
    pub fn output_schema(&self) -> OutputSchema {
        let mut schema = OutputSchema::new();
        for score in &self.scores {
            schema = schema.score(&score.name, &score.description);
        }
        schema = schema.text(RATIONALE_FIELD, "Detailed reasoning behind the scores");
        if let Some(ref list) = self.insight_list {
            schema = schema.list(list, "Key positive findings");
        }
        if let Some(ref list) = self.risk_list {
            schema = schema.list(list, "Main risks and challenges");
        }
        schema
    }

    /// Bucket a declared score is routed to.
    pub fn bucket_for(&self, score: &str) -> Option<ScoreBucket> {
        self.scores.iter().find(|s| s.name == score).map(|s| s.bucket)
    }
}

// ─────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────

/// The full set of blueprints, in registration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaCatalog {
    #[serde(rename = "persona")]
    pub personas: Vec<PersonaBlueprint>,
}

impl PersonaCatalog {
    /// Catalog shipped with the binary.
    pub fn bundled() -> Result<Self> {
        Self::from_toml(include_str!("../../config/personas.toml"))
    }

    /// Parse and validate a catalog document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let catalog: PersonaCatalog = toml::from_str(content).map_err(|e| Error::ConfigParse {
            message: format!("invalid persona catalog: {}", e),
            source: Some(e),
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for p in &self.personas {
            if p.id.trim().is_empty() {
                return Err(Error::config_field_invalid("persona.id", "persona id must not be empty"));
            }
            if !seen.insert(p.id.as_str()) {
                return Err(Error::config_field_invalid(
                    "persona.id",
                    format!("duplicate persona id '{}'", p.id),
                ));
            }
            if !p.privileged && p.scores.is_empty() {
                return Err(Error::config_field_invalid(
                    "persona.score",
                    format!("persona '{}' declares no scores", p.id),
                ));
            }
        }

        let privileged = self.personas.iter().filter(|p| p.privileged).count();
        if privileged != 1 {
            return Err(Error::config_field_invalid(
                "persona.privileged",
                format!("expected exactly one privileged persona, found {}", privileged),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────

/// Current view of a persona: identity plus mutable settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub priority: i32,
}

/// Persisted per-persona settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaSettings {
    pub enabled: bool,
    pub priority: i32,
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

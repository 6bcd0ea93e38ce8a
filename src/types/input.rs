//! Evaluation input
//!
//! The idea under evaluation plus optional free-form context blocks.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Free-form key/value context supplied by the caller
pub type ContextMap = Map<String, Value>;

// ─────────────────────────────────────────────────────────────────
// Context Block
// ─────────────────────────────────────────────────────────────────

/// Named context areas a caller can describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextBlock {
    Market,
    Technical,
    Social,
    Research,
    Community,
    Educational,
    Ai,
    UserBackground,
}

impl ContextBlock {
    pub fn all() -> &'static [ContextBlock] {
        &[
            ContextBlock::Market,
            ContextBlock::Technical,
            ContextBlock::Social,
            ContextBlock::Research,
            ContextBlock::Community,
            ContextBlock::Educational,
            ContextBlock::Ai,
            ContextBlock::UserBackground,
        ]
    }

    /// Slug used in catalog files and CLI args
    pub fn slug(&self) -> &'static str {
        match self {
            ContextBlock::Market => "market",
            ContextBlock::Technical => "technical",
            ContextBlock::Social => "social",
            ContextBlock::Research => "research",
            ContextBlock::Community => "community",
            ContextBlock::Educational => "educational",
            ContextBlock::Ai => "ai",
            ContextBlock::UserBackground => "user_background",
        }
    }
}

impl fmt::Display for ContextBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for ContextBlock {
    type Err = String;

    /// Accepts the slug with or without a `_context` suffix
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase().replace('-', "_");
        let key = lower.strip_suffix("_context").unwrap_or(&lower);
        ContextBlock::all()
            .iter()
            .find(|b| b.slug() == key)
            .copied()
            .ok_or_else(|| {
                format!(
                    "Unknown context block '{}'. Valid: market, technical, social, research, community, educational, ai, user_background",
                    s
                )
            })
    }
}

// ─────────────────────────────────────────────────────────────────
// Evaluation Input
// ─────────────────────────────────────────────────────────────────

/// A validated product idea with its context blocks
///
/// Built once, then shared read-only by every persona.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationInput {
    idea: String,
    contexts: BTreeMap<ContextBlock, ContextMap>,
}

impl EvaluationInput {
    /// Create an input; the idea must contain non-whitespace text
    pub fn new(idea: impl Into<String>) -> Result<Self> {
        let idea = idea.into();
        let trimmed = idea.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("product idea must not be empty".to_string()));
        }
        Ok(Self {
            idea: trimmed.to_string(),
            contexts: BTreeMap::new(),
        })
    }

    /// Attach (or replace) a context block
    pub fn with_context(mut self, block: ContextBlock, context: ContextMap) -> Self {
        self.contexts.insert(block, context);
        self
    }

    /// Attach a context block holding a single `description` entry
    pub fn with_description(self, block: ContextBlock, text: impl Into<String>) -> Self {
        let mut map = ContextMap::new();
        map.insert("description".to_string(), Value::String(text.into()));
        self.with_context(block, map)
    }

    /// Merge context blocks from a JSON document
    ///
    /// Keys name blocks (`market` or `market_context`); values are objects or
    /// plain strings, which become `{"description": ...}`.
    pub fn with_context_document(mut self, document: Value) -> Result<Self> {
        let Value::Object(entries) = document else {
            return Err(Error::InvalidInput(
                "context document must be a JSON object".to_string(),
            ));
        };

        for (key, value) in entries {
            let block: ContextBlock = key.parse().map_err(Error::InvalidInput)?;
            self = match value {
                Value::Object(map) => self.with_context(block, map),
                Value::String(text) => self.with_description(block, text),
                Value::Null => self,
                other => {
                    return Err(Error::InvalidInput(format!(
                        "context '{}' must be an object or string, got {}",
                        key, other
                    )))
                }
            };
        }
        Ok(self)
    }

    pub fn idea(&self) -> &str {
        &self.idea
    }

    pub fn context(&self, block: ContextBlock) -> Option<&ContextMap> {
        self.contexts.get(&block)
    }

    pub fn contexts(&self) -> &BTreeMap<ContextBlock, ContextMap> {
        &self.contexts
    }

    /// Context block as pretty JSON, `{}` when absent
    pub fn render_context(&self, block: ContextBlock) -> String {
        self.context(block)
            .and_then(|map| serde_json::to_string_pretty(map).ok())
            .unwrap_or_else(|| "{}".to_string())
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

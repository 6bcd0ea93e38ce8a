//! Persona output records
//!
//! Every ordinary persona produces the same generic `AgentSignal`; the final
//! advisor produces a `ProjectRecommendation`. Scores are routed into shared
//! `ScoreBucket`s by the persona catalog.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::structured::OutputSchema;

// ─────────────────────────────────────────────────────────────────
// Score Buckets
// ─────────────────────────────────────────────────────────────────

/// Aggregation buckets persona scores are routed into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBucket {
    Opportunity,
    MarketPotential,
    TechnicalFeasibility,
    ScientificBreakthroughPotential,
    TechnicalAdvancement,
    ResearchFeasibility,
    StartupPotential,
    AiInfrastructure,
    PlatformPotential,
    SocialImpact,
    AutonomousSystems,
    EducationalImpact,
    InnovationPotential,
}

impl ScoreBucket {
    /// Buckets averaged into the overall score
    pub const HEADLINE: [ScoreBucket; 6] = [
        ScoreBucket::Opportunity,
        ScoreBucket::MarketPotential,
        ScoreBucket::TechnicalFeasibility,
        ScoreBucket::ScientificBreakthroughPotential,
        ScoreBucket::AiInfrastructure,
        ScoreBucket::InnovationPotential,
    ];

    pub fn all() -> &'static [ScoreBucket] {
        &[
            ScoreBucket::Opportunity,
            ScoreBucket::MarketPotential,
            ScoreBucket::TechnicalFeasibility,
            ScoreBucket::ScientificBreakthroughPotential,
            ScoreBucket::TechnicalAdvancement,
            ScoreBucket::ResearchFeasibility,
            ScoreBucket::StartupPotential,
            ScoreBucket::AiInfrastructure,
            ScoreBucket::PlatformPotential,
            ScoreBucket::SocialImpact,
            ScoreBucket::AutonomousSystems,
            ScoreBucket::EducationalImpact,
            ScoreBucket::InnovationPotential,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScoreBucket::Opportunity => "opportunity",
            ScoreBucket::MarketPotential => "market_potential",
            ScoreBucket::TechnicalFeasibility => "technical_feasibility",
            ScoreBucket::ScientificBreakthroughPotential => "scientific_breakthrough_potential",
            ScoreBucket::TechnicalAdvancement => "technical_advancement",
            ScoreBucket::ResearchFeasibility => "research_feasibility",
            ScoreBucket::StartupPotential => "startup_potential",
            ScoreBucket::AiInfrastructure => "ai_infrastructure",
            ScoreBucket::PlatformPotential => "platform_potential",
            ScoreBucket::SocialImpact => "social_impact",
            ScoreBucket::AutonomousSystems => "autonomous_systems",
            ScoreBucket::EducationalImpact => "educational_impact",
            ScoreBucket::InnovationPotential => "innovation_potential",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> String {
        let name = self.name().replace('_', " ");
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => name,
        }
    }
}

impl fmt::Display for ScoreBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ScoreBucket {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        ScoreBucket::all()
            .iter()
            .find(|b| b.name() == key)
            .copied()
            .ok_or_else(|| format!("Unknown score bucket '{}'", s))
    }
}

// ─────────────────────────────────────────────────────────────────
// Agent Signal
// ─────────────────────────────────────────────────────────────────

/// Structured opinion of one ordinary persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSignal {
    pub persona_id: String,

    /// Declared score name → value in [0, 1]
    pub scores: BTreeMap<String, f64>,

    pub rationale: String,

    /// Declared list name → items
    pub lists: BTreeMap<String, Vec<String>>,

    /// True when one or more topic analyses fell back to a placeholder
    #[serde(default)]
    pub degraded: bool,
}

impl AgentSignal {
    pub fn score(&self, name: &str) -> Option<f64> {
        self.scores.get(name).copied()
    }

    pub fn list(&self, name: &str) -> &[String] {
        self.lists.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ─────────────────────────────────────────────────────────────────
// Project Recommendation
// ─────────────────────────────────────────────────────────────────

/// Four-phase delivery plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationTimeline {
    pub phase1: String,
    pub phase2: String,
    pub phase3: String,
    pub phase4: String,
    pub total_duration: String,
    pub key_milestones: Vec<String>,
}

impl RecommendationTimeline {
    pub fn schema() -> OutputSchema {
        OutputSchema::new()
            .text("phase1", "Initial setup and planning, with duration")
            .text("phase2", "Core development, with duration")
            .text("phase3", "Testing and refinement, with duration")
            .text("phase4", "Launch preparation, with duration")
            .text("total_duration", "Overall expected duration")
            .list("key_milestones", "Key milestones across the phases")
    }

    /// Phases in order
    pub fn phases(&self) -> [&str; 4] {
        [
            self.phase1.as_str(),
            self.phase2.as_str(),
            self.phase3.as_str(),
            self.phase4.as_str(),
        ]
    }
}

/// Final go/no-go recommendation from the advisor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecommendation {
    pub pursue_project: bool,

    /// Certainty in the recommendation, in [0, 1]
    pub confidence_score: f64,

    pub key_factors: Vec<String>,
    pub resource_requirements: Vec<String>,
    pub timeline: RecommendationTimeline,
    pub next_steps: Vec<String>,
    pub alternative_suggestions: Vec<String>,

    /// True when the record was synthesized after retry exhaustion
    #[serde(default)]
    pub degraded: bool,
}

impl ProjectRecommendation {
    /// Output schema requested from the advisor
    pub fn schema() -> OutputSchema {
        OutputSchema::new()
            .flag("pursue_project", "Whether to pursue the project")
            .score("confidence_score", "Confidence in the recommendation")
            .list("key_factors", "Key factors influencing the decision (3-5 items)")
            .list("resource_requirements", "Required resources and team (3-5 items)")
            .object("timeline", RecommendationTimeline::schema(), "Proposed project timeline")
            .list("next_steps", "Immediate next steps if pursuing (3-5 items)")
            .list("alternative_suggestions", "Alternative approaches if not pursuing (3-5 items)")
    }

    /// Build from a value already repaired against `schema()`
    pub fn from_value(value: Value, degraded: bool) -> Result<Self> {
        let mut rec: ProjectRecommendation = serde_json::from_value(value)
            .map_err(|e| Error::parse_failed(format!("Invalid recommendation structure: {}", e)))?;
        rec.degraded = degraded;
        Ok(rec)
    }
}

// ─────────────────────────────────────────────────────────────────
// Signal Record
// ─────────────────────────────────────────────────────────────────

/// Output of any persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalRecord {
    Assessment(AgentSignal),
    Recommendation(ProjectRecommendation),
}

impl SignalRecord {
    pub fn is_degraded(&self) -> bool {
        match self {
            SignalRecord::Assessment(signal) => signal.degraded,
            SignalRecord::Recommendation(rec) => rec.degraded,
        }
    }

    pub fn as_assessment(&self) -> Option<&AgentSignal> {
        match self {
            SignalRecord::Assessment(signal) => Some(signal),
            SignalRecord::Recommendation(_) => None,
        }
    }

    pub fn as_recommendation(&self) -> Option<&ProjectRecommendation> {
        match self {
            SignalRecord::Recommendation(rec) => Some(rec),
            SignalRecord::Assessment(_) => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bucket_names_roundtrip() {
        assert_eq!(ScoreBucket::all().len(), 13);
        for bucket in ScoreBucket::all() {
            assert_eq!(bucket.name().parse::<ScoreBucket>().unwrap(), *bucket);
        }
        assert!("vibes".parse::<ScoreBucket>().is_err());
    }

    #[test]
    fn test_bucket_label() {
        assert_eq!(ScoreBucket::AiInfrastructure.label(), "Ai infrastructure");
        assert_eq!(ScoreBucket::Opportunity.label(), "Opportunity");
    }

    #[test]
    fn test_bucket_serde() {
        let json = serde_json::to_string(&ScoreBucket::ScientificBreakthroughPotential).unwrap();
        assert_eq!(json, "\"scientific_breakthrough_potential\"");
    }

    #[test]
    fn test_recommendation_from_default() {
        let value = ProjectRecommendation::schema().default_value();
        let rec = ProjectRecommendation::from_value(value, true).unwrap();

        assert!(!rec.pursue_project);
        assert_eq!(rec.confidence_score, 0.0);
        assert_eq!(rec.timeline.phase1, "Unable to generate phase1");
        assert!(rec.degraded);
    }

    #[test]
    fn test_recommendation_from_partial_model_output() {
        let repaired = ProjectRecommendation::schema().fill_missing(json!({
            "pursue_project": true,
            "confidence_score": 0.8,
            "next_steps": ["Build prototype", "Interview users"],
            "timeline": {"phase1": "Planning (1 month)"}
        }));
        let rec = ProjectRecommendation::from_value(repaired.value, false).unwrap();

        assert!(rec.pursue_project);
        assert_eq!(rec.next_steps.len(), 2);
        assert_eq!(rec.timeline.phase1, "Planning (1 month)");
        assert_eq!(rec.timeline.phases()[3], "Unable to generate phase4");
        assert!(!rec.degraded);
    }

    #[test]
    fn test_signal_record_tagging() {
        let signal = AgentSignal {
            persona_id: "sam_altman".to_string(),
            scores: BTreeMap::from([("opportunity_score".to_string(), 0.7)]),
            rationale: "solid".to_string(),
            lists: BTreeMap::new(),
            degraded: false,
        };
        let record = SignalRecord::Assessment(signal.clone());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["kind"], "assessment");
        assert_eq!(value["persona_id"], "sam_altman");
        assert_eq!(record.as_assessment(), Some(&signal));
        assert!(record.as_recommendation().is_none());
        assert!(signal.list("missing").is_empty());
    }
}

//! Consolidated evaluation result

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::signal::{ProjectRecommendation, ScoreBucket, SignalRecord};

/// One persona's place in the result, in registration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaSlot {
    pub persona_id: String,

    /// `None` when the persona failed or missed the deadline
    pub signal: Option<SignalRecord>,
}

/// Where the final recommendation list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    /// Advisor's next steps
    Advisor,
    /// Dedicated synthesis call
    Synthesized,
    /// Built-in generic list
    Generic,
}

/// Merged output of one evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedEvaluation {
    pub run_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    pub idea: String,

    pub overall_score: f64,
    pub market_potential: f64,
    pub technical_feasibility: f64,
    pub innovation_potential: f64,

    /// Average of every bucket, 0.0 for buckets nobody scored
    pub buckets: BTreeMap<ScoreBucket, f64>,

    pub key_insights: Vec<String>,
    pub potential_risks: Vec<String>,
    pub persona_signals: Vec<PersonaSlot>,

    pub recommendations: Vec<String>,
    pub recommendation_source: RecommendationSource,
    pub project_recommendation: Option<ProjectRecommendation>,
}

impl UnifiedEvaluation {
    /// Ids of personas that produced a record
    pub fn present_personas(&self) -> Vec<&str> {
        self.persona_signals
            .iter()
            .filter(|slot| slot.signal.is_some())
            .map(|slot| slot.persona_id.as_str())
            .collect()
    }

    /// Ids of selected personas that produced nothing
    pub fn absent_personas(&self) -> Vec<&str> {
        self.persona_signals
            .iter()
            .filter(|slot| slot.signal.is_none())
            .map(|slot| slot.persona_id.as_str())
            .collect()
    }

    /// True when any persona is absent or any record was default-filled
    pub fn is_degraded(&self) -> bool {
        self.persona_signals.iter().any(|slot| match &slot.signal {
            None => true,
            Some(record) => record.is_degraded(),
        })
    }

    pub fn signal(&self, persona_id: &str) -> Option<&SignalRecord> {
        self.persona_signals
            .iter()
            .find(|slot| slot.persona_id == persona_id)
            .and_then(|slot| slot.signal.as_ref())
    }

    pub fn bucket(&self, bucket: ScoreBucket) -> f64 {
        self.buckets.get(&bucket).copied().unwrap_or(0.0)
    }
}

//! Persona evaluation pipeline.
//!
//! An ordinary persona runs every topic as an independent free-text call,
//! bundles the answers as JSON evidence and makes one structured synthesis
//! call. The privileged advisor makes a single structured call over the
//! aggregated results of the other personas.

use std::collections::BTreeMap;

use futures_util::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::structured::{placeholder_text, StructuredCaller};
use crate::types::{AgentSignal, ContextBlock, EvaluationInput, ProjectRecommendation, ScoreBucket};

use super::types::{PersonaBlueprint, TopicSpec, RATIONALE_FIELD};

/// Aggregated material handed to the advisor.
#[derive(Debug, Clone, Default)]
pub struct AdvisorBrief {
    pub buckets: BTreeMap<ScoreBucket, f64>,
    pub insights: Vec<String>,
    pub risks: Vec<String>,
    pub expertise: Vec<String>,
}

/// Runs persona pipelines against a shared structured caller.
#[derive(Clone)]
pub struct PersonaEvaluator {
    caller: StructuredCaller,
}

impl PersonaEvaluator {
    pub fn new(caller: StructuredCaller) -> Self {
        Self { caller }
    }

    pub fn caller(&self) -> &StructuredCaller {
        &self.caller
    }

    // ─────────────────────────────────────────────────────────────
    // Ordinary personas
    // ─────────────────────────────────────────────────────────────

    /// Run topics then synthesis, producing the persona's signal.
    ///
    /// A synthesis call that never yields usable output fails the persona, so
    /// it is reported absent rather than scored with defaults. Failed topic
    /// analyses only mark the signal degraded.
    pub async fn assess(
        &self,
        blueprint: &PersonaBlueprint,
        input: &EvaluationInput,
    ) -> Result<AgentSignal> {
        if blueprint.privileged {
            return Err(Error::persona_failed(
                &blueprint.id,
                "privileged persona cannot produce an assessment",
            ));
        }

        let analyses = join_all(blueprint.topics.iter().map(|topic| {
            let prompt = topic_prompt(topic, input);
            async move { self.caller.invoke_detailed(&prompt, None).await }
        }))
        .await;

        let mut evidence = Map::new();
        let mut degraded_topics = 0;
        for (topic, outcome) in blueprint.topics.iter().zip(analyses) {
            let outcome = outcome?;
            if outcome.degraded {
                degraded_topics += 1;
            }
            evidence.insert(topic.key.clone(), outcome.value);
        }
        debug!(
            persona = %blueprint.id,
            topics = blueprint.topics.len(),
            degraded_topics,
            "Topic analyses complete"
        );

        let schema = blueprint.output_schema();
        let prompt = synthesis_prompt(blueprint, input, &Value::Object(evidence));
        let outcome = self.caller.invoke_detailed(&prompt, Some(&schema)).await?;
        if outcome.degraded {
            warn!(
                persona = %blueprint.id,
                attempts = outcome.attempts,
                "Synthesis produced no usable output"
            );
            return Err(Error::persona_failed(
                &blueprint.id,
                format!("synthesis unusable after {} attempts", outcome.attempts),
            ));
        }

        let signal = signal_from_value(blueprint, &outcome.value, degraded_topics > 0)?;
        info!(
            persona = %blueprint.id,
            attempts = outcome.attempts,
            degraded = signal.degraded,
            "Persona assessment complete"
        );
        Ok(signal)
    }

    // ─────────────────────────────────────────────────────────────
    // Advisor
    // ─────────────────────────────────────────────────────────────

    /// Produce the final recommendation from the aggregated brief.
    pub async fn advise(
        &self,
        blueprint: &PersonaBlueprint,
        input: &EvaluationInput,
        brief: &AdvisorBrief,
    ) -> Result<ProjectRecommendation> {
        let schema = ProjectRecommendation::schema();
        let prompt = advisor_prompt(blueprint, input, brief);
        let outcome = self.caller.invoke_detailed(&prompt, Some(&schema)).await?;

        let rec = ProjectRecommendation::from_value(outcome.value, outcome.degraded)
            .map_err(|e| Error::persona_failed(&blueprint.id, e.to_string()))?;
        info!(
            persona = %blueprint.id,
            pursue = rec.pursue_project,
            confidence = rec.confidence_score,
            degraded = rec.degraded,
            "Advisor recommendation complete"
        );
        Ok(rec)
    }
}

// ─────────────────────────────────────────────────────────────────
// Prompt templates
// ─────────────────────────────────────────────────────────────────

fn topic_prompt(topic: &TopicSpec, input: &EvaluationInput) -> String {
    let mut prompt = format!("{} for: {}\nConsider:\n", topic.title, input.idea());
    for (i, point) in topic.considerations.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, point));
    }
    if let Some(block) = topic.context {
        prompt.push_str(&format!("\nContext: {}\n", input.render_context(block)));
    }
    prompt
}

fn synthesis_prompt(blueprint: &PersonaBlueprint, input: &EvaluationInput, evidence: &Value) -> String {
    let evidence = serde_json::to_string_pretty(evidence).unwrap_or_else(|_| evidence.to_string());

    let mut prompt = String::new();
    if let Some(ref guidance) = blueprint.guidance {
        prompt.push_str(guidance.trim());
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!(
        "As {}, evaluate this product idea: {}\n\nAnalysis data:\n{}\n\nProvide:\n",
        blueprint.name,
        input.idea(),
        evidence
    ));

    let mut n = 1;
    for score in &blueprint.scores {
        prompt.push_str(&format!("{}. {} score (0-1)\n", n, score.description));
        n += 1;
    }
    prompt.push_str(&format!("{}. Detailed reasoning\n", n));
    if let Some(ref list) = blueprint.insight_list {
        n += 1;
        prompt.push_str(&format!("{}. {}\n", n, list.replace('_', " ")));
    }
    if let Some(ref list) = blueprint.risk_list {
        n += 1;
        prompt.push_str(&format!("{}. {}\n", n, list.replace('_', " ")));
    }
    prompt
}

fn advisor_prompt(blueprint: &PersonaBlueprint, input: &EvaluationInput, brief: &AdvisorBrief) -> String {
    let scores: BTreeMap<&str, f64> = brief.buckets.iter().map(|(b, v)| (b.name(), *v)).collect();

    let mut prompt = String::new();
    if let Some(ref guidance) = blueprint.guidance {
        prompt.push_str(guidance.trim());
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!(
        "Product Idea: {}\n\nUser Background:\n{}\n\nExpert Analysis:\nScores: {}\nKey Insights: {}\nPotential Risks: {}\nRequired Expertise: {}\n\n\
         Based on this information, provide a recommendation on whether to pursue this project.",
        input.idea(),
        input.render_context(ContextBlock::UserBackground),
        pretty(&scores),
        pretty(&brief.insights),
        pretty(&brief.risks),
        pretty(&brief.expertise),
    ));
    prompt
}

/// Pretty JSON for prompt embedding.
fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}

// ─────────────────────────────────────────────────────────────────
// Output conversion
// ─────────────────────────────────────────────────────────────────

/// Build a signal from a value already repaired against the persona schema.
fn signal_from_value(blueprint: &PersonaBlueprint, value: &Value, degraded: bool) -> Result<AgentSignal> {
    let missing = |field: &str| {
        Error::persona_failed(&blueprint.id, format!("synthesis output lacks '{}'", field))
    };

    let mut scores = BTreeMap::new();
    for spec in &blueprint.scores {
        let score = value
            .get(&spec.name)
            .and_then(Value::as_f64)
            .ok_or_else(|| missing(&spec.name))?;
        scores.insert(spec.name.clone(), score);
    }

    let rationale = value
        .get(RATIONALE_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| placeholder_text(RATIONALE_FIELD));

    let mut lists = BTreeMap::new();
    for name in [&blueprint.insight_list, &blueprint.risk_list].into_iter().flatten() {
        let items = value
            .get(name)
            .and_then(Value::as_array)
            .ok_or_else(|| missing(name))?
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        lists.insert(name.clone(), items);
    }

    Ok(AgentSignal {
        persona_id: blueprint.id.clone(),
        scores,
        rationale,
        lists,
        degraded,
    })
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

//! Evaluation orchestrator
//!
//! Fans an idea out to the selected personas, merges their signals into
//! bucket averages and lists, then asks the advisor for the final call.
//! Only fatal errors escape `evaluate`; everything else degrades into absent
//! slots or fallback recommendations.

pub mod aggregate;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::time::{timeout_at, Instant};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::persona::{PersonaBlueprint, PersonaEvaluator, PersonaRegistry};
use crate::structured::OutputSchema;
use crate::types::{
    AgentSignal, EvaluationInput, PersonaSlot, ProjectRecommendation, RecommendationSource,
    ScoreBucket, SignalRecord, UnifiedEvaluation,
};

pub use aggregate::{
    generic_recommendations, normalize_recommendations, Aggregation, GENERIC_RECOMMENDATIONS,
};

const RECOMMENDATIONS_FIELD: &str = "recommendations";

/// Run-level knobs
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Wall-clock bound for the whole run; late personas become absent
    pub deadline: Option<Duration>,

    /// Length of the synthesized or generic recommendation list
    pub recommendation_count: usize,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            deadline: None,
            recommendation_count: GENERIC_RECOMMENDATIONS.len(),
        }
    }
}

/// Personas picked for one run, in registration order
struct Selection {
    ordinary: Vec<Arc<PersonaBlueprint>>,
    advisor: Option<Arc<PersonaBlueprint>>,
}

/// Drives one evaluation run across the persona council
pub struct Orchestrator {
    evaluator: PersonaEvaluator,
    registry: Arc<RwLock<PersonaRegistry>>,
    options: OrchestratorOptions,
}

impl Orchestrator {
    pub fn new(evaluator: PersonaEvaluator, registry: Arc<RwLock<PersonaRegistry>>) -> Self {
        Self {
            evaluator,
            registry,
            options: OrchestratorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Arc<RwLock<PersonaRegistry>> {
        &self.registry
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    /// Evaluate an idea with every registered persona, or with `selected` when given
    ///
    /// Enable flags are not consulted here; callers that honor them pass
    /// `enabled_set()` explicitly.
    ///
    /// Unknown ids in `selected` are dropped and duplicates collapsed. A
    /// persona that fails or misses the deadline leaves an empty slot; the
    /// run still completes with whatever was collected.
    pub async fn evaluate(
        &self,
        input: EvaluationInput,
        selected: Option<&[String]>,
    ) -> Result<UnifiedEvaluation> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let deadline = self.options.deadline.map(|d| started + d);
        let selection = self.select(selected);
        let input = Arc::new(input);

        info!(
            run_id = %run_id,
            personas = selection.ordinary.len(),
            advisor = selection.advisor.is_some(),
            deadline_secs = self.options.deadline.map(|d| d.as_secs()),
            "Starting evaluation"
        );

        // Ordinary personas, concurrently; join_all keeps input order
        let results = join_all(selection.ordinary.iter().map(|bp| {
            let input = Arc::clone(&input);
            let bp = Arc::clone(bp);
            async move {
                let span = info_span!("persona", id = %bp.id);
                self.bounded(&bp.id, deadline, self.evaluator.assess(&bp, &input))
                    .instrument(span)
                    .await
            }
        }))
        .await;

        let mut slots = Vec::with_capacity(selection.ordinary.len() + 1);
        let mut present: Vec<(Arc<PersonaBlueprint>, AgentSignal)> = Vec::new();
        for (bp, result) in selection.ordinary.iter().zip(results) {
            let signal = result?;
            if let Some(ref signal) = signal {
                present.push((Arc::clone(bp), signal.clone()));
            }
            slots.push(PersonaSlot {
                persona_id: bp.id.clone(),
                signal: signal.map(SignalRecord::Assessment),
            });
        }

        let aggregation = Aggregation::from_signals(present.iter().map(|(bp, s)| (bp.as_ref(), s)));
        info!(
            run_id = %run_id,
            present = present.len(),
            absent = selection.ordinary.len() - present.len(),
            overall = aggregation.overall_score(),
            "Persona signals aggregated"
        );

        // Advisor last, over the aggregate
        let mut project_recommendation = None;
        if let Some(ref advisor) = selection.advisor {
            let brief = aggregation.advisor_brief();
            let span = info_span!("persona", id = %advisor.id);
            let rec = self
                .bounded(&advisor.id, deadline, self.evaluator.advise(advisor, &input, &brief))
                .instrument(span)
                .await?;
            slots.push(PersonaSlot {
                persona_id: advisor.id.clone(),
                signal: rec.clone().map(SignalRecord::Recommendation),
            });
            project_recommendation = rec;
        }

        let (recommendations, recommendation_source) = self
            .recommendations(
                &input,
                &aggregation,
                project_recommendation.as_ref(),
                !present.is_empty(),
                deadline,
            )
            .await?;

        let evaluation = UnifiedEvaluation {
            run_id,
            evaluated_at: Utc::now(),
            idea: input.idea().to_string(),
            overall_score: aggregation.overall_score(),
            market_potential: aggregation.bucket(ScoreBucket::MarketPotential),
            technical_feasibility: aggregation.bucket(ScoreBucket::TechnicalFeasibility),
            innovation_potential: aggregation.innovation_potential(),
            buckets: aggregation.buckets,
            key_insights: aggregation.key_insights,
            potential_risks: aggregation.potential_risks,
            persona_signals: slots,
            recommendations,
            recommendation_source,
            project_recommendation,
        };

        info!(
            run_id = %run_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            overall = evaluation.overall_score,
            degraded = evaluation.is_degraded(),
            source = ?evaluation.recommendation_source,
            "Evaluation complete"
        );
        Ok(evaluation)
    }

    /// Resolve the personas for this run under a short read lock
    fn select(&self, selected: Option<&[String]>) -> Selection {
        let registry = self.registry.read();
        let ids = match selected {
            None => registry.blueprints().iter().map(|bp| bp.id.clone()).collect(),
            Some(requested) => {
                for id in requested.iter().filter(|id| !registry.is_known(id)) {
                    warn!(persona = %id, "Ignoring unknown persona");
                }
                requested.to_vec()
            }
        };

        let mut selection = Selection {
            ordinary: Vec::new(),
            advisor: None,
        };
        for bp in registry.blueprints() {
            if !ids.iter().any(|id| *id == bp.id) {
                continue;
            }
            if bp.privileged {
                selection.advisor = Some(Arc::clone(bp));
            } else {
                selection.ordinary.push(Arc::clone(bp));
            }
        }
        selection
    }

    /// Await a persona future under the run deadline
    ///
    /// Fatal errors are returned; other failures and timeouts yield `None`.
    async fn bounded<T, F>(&self, id: &str, deadline: Option<Instant>, fut: F) -> Result<Option<T>>
    where
        F: Future<Output = Result<T>>,
    {
        let result = match deadline {
            Some(at) => timeout_at(at, fut)
                .await
                .unwrap_or_else(|_| Err(Error::Cancelled("run deadline expired".to_string()))),
            None => fut.await,
        };

        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(persona = %id, error = %e, code = %e.code(), "Persona evaluation failed");
                Ok(None)
            }
        }
    }

    /// Pick the final recommendation list
    ///
    /// Advisor next steps when usable, else one synthesis call, else the
    /// generic list. Synthesis is skipped when no persona produced anything.
    async fn recommendations(
        &self,
        input: &EvaluationInput,
        aggregation: &Aggregation,
        advisor: Option<&ProjectRecommendation>,
        have_signals: bool,
        deadline: Option<Instant>,
    ) -> Result<(Vec<String>, RecommendationSource)> {
        let count = self.options.recommendation_count;

        if let Some(rec) = advisor {
            if !rec.degraded && !rec.next_steps.is_empty() {
                return Ok((rec.next_steps.clone(), RecommendationSource::Advisor));
            }
        }

        if !have_signals {
            return Ok((generic_recommendations(count), RecommendationSource::Generic));
        }

        let schema = OutputSchema::new().list(
            RECOMMENDATIONS_FIELD,
            format!("Exactly {} specific, actionable recommendations", count),
        );
        let prompt = recommendation_prompt(input, aggregation, count);
        let call = self.evaluator.caller().invoke_detailed(&prompt, Some(&schema));

        let outcome = match self.bounded("recommendations", deadline, call).await? {
            Some(outcome) if !outcome.degraded => outcome,
            _ => return Ok((generic_recommendations(count), RecommendationSource::Generic)),
        };

        let items: Vec<String> = outcome
            .value
            .get(RECOMMENDATIONS_FIELD)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        if items.is_empty() {
            return Ok((generic_recommendations(count), RecommendationSource::Generic));
        }
        Ok((normalize_recommendations(items, count), RecommendationSource::Synthesized))
    }
}

fn recommendation_prompt(input: &EvaluationInput, aggregation: &Aggregation, count: usize) -> String {
    let scores: Vec<String> = ScoreBucket::HEADLINE
        .iter()
        .map(|b| format!("- {}: {:.2}", b.label(), aggregation.bucket(*b)))
        .collect();
    let bullets = |items: &[String]| -> String {
        if items.is_empty() {
            return "- none".to_string();
        }
        items
            .iter()
            .map(|s| format!("- {}", s))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Product idea: {}\n\nScores:\n{}\n\nKey insights:\n{}\n\nPotential risks:\n{}\n\n\
         Based on this evaluation, give exactly {} specific, actionable recommendations for the founders.",
        input.idea(),
        scores.join("\n"),
        bullets(&aggregation.key_insights),
        bullets(&aggregation.potential_risks),
        count
    )
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

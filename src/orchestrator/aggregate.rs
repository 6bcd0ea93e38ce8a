//! Score and list aggregation across persona signals

use std::collections::BTreeMap;

use crate::persona::{AdvisorBrief, PersonaBlueprint};
use crate::types::{AgentSignal, ScoreBucket};

/// Fallback list used when no model-produced recommendations are available
pub const GENERIC_RECOMMENDATIONS: [&str; 5] = [
    "Conduct more detailed market research",
    "Develop a minimum viable product (MVP)",
    "Assemble a diverse team with complementary skills",
    "Create a detailed roadmap with milestones",
    "Establish key performance indicators (KPIs)",
];

/// Merged view of every present ordinary persona
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Mean per bucket; every bucket present, 0.0 when nobody contributed
    pub buckets: BTreeMap<ScoreBucket, f64>,
    pub key_insights: Vec<String>,
    pub potential_risks: Vec<String>,
    /// Expertise areas of contributing personas, first-seen order
    pub expertise: Vec<String>,
}

impl Aggregation {
    /// Fold signals given in registration order
    pub fn from_signals<'a, I>(signals: I) -> Self
    where
        I: IntoIterator<Item = (&'a PersonaBlueprint, &'a AgentSignal)>,
    {
        let mut sums: BTreeMap<ScoreBucket, (f64, u32)> = BTreeMap::new();
        let mut agg = Aggregation::default();

        for (blueprint, signal) in signals {
            for spec in &blueprint.scores {
                if let Some(score) = signal.score(&spec.name) {
                    let entry = sums.entry(spec.bucket).or_insert((0.0, 0));
                    entry.0 += score;
                    entry.1 += 1;
                }
            }

            if let Some(ref name) = blueprint.insight_list {
                agg.key_insights.extend(signal.list(name).iter().cloned());
            }
            if let Some(ref name) = blueprint.risk_list {
                agg.potential_risks.extend(signal.list(name).iter().cloned());
            }
            for area in &blueprint.expertise {
                if !agg.expertise.contains(area) {
                    agg.expertise.push(area.clone());
                }
            }
        }

        agg.buckets = ScoreBucket::all()
            .iter()
            .map(|bucket| {
                let mean = match sums.get(bucket) {
                    Some((sum, count)) if *count > 0 => sum / f64::from(*count),
                    _ => 0.0,
                };
                (*bucket, mean)
            })
            .collect();

        agg
    }

    pub fn bucket(&self, bucket: ScoreBucket) -> f64 {
        self.buckets.get(&bucket).copied().unwrap_or(0.0)
    }

    /// Unweighted mean of the headline buckets
    pub fn overall_score(&self) -> f64 {
        let total: f64 = ScoreBucket::HEADLINE.iter().map(|b| self.bucket(*b)).sum();
        total / ScoreBucket::HEADLINE.len() as f64
    }

    /// Innovation headline; taken from the breakthrough bucket
    pub fn innovation_potential(&self) -> f64 {
        self.bucket(ScoreBucket::ScientificBreakthroughPotential)
    }

    pub fn advisor_brief(&self) -> AdvisorBrief {
        AdvisorBrief {
            buckets: self.buckets.clone(),
            insights: self.key_insights.clone(),
            risks: self.potential_risks.clone(),
            expertise: self.expertise.clone(),
        }
    }
}

/// Force a recommendation list to exactly `count` items
///
/// Extra items are dropped; a short list is padded from the generic list,
/// skipping entries already present.
pub fn normalize_recommendations(mut items: Vec<String>, count: usize) -> Vec<String> {
    items.retain(|s| !s.trim().is_empty());
    items.truncate(count);

    for generic in GENERIC_RECOMMENDATIONS {
        if items.len() >= count {
            break;
        }
        if !items.iter().any(|s| s == generic) {
            items.push(generic.to_string());
        }
    }
    items
}

/// The generic list, truncated to `count`
pub fn generic_recommendations(count: usize) -> Vec<String> {
    GENERIC_RECOMMENDATIONS
        .iter()
        .take(count)
        .map(|s| s.to_string())
        .collect()
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

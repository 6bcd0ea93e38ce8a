//! Human-readable rendering of an evaluation

use std::fmt::Write;

use crate::types::{RecommendationSource, ScoreBucket, SignalRecord, UnifiedEvaluation};

const RULE: &str = "────────────────────────────────────────────────────────────";

/// Render the evaluation as plain text
pub fn render_text(eval: &UnifiedEvaluation) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Idea: {}", eval.idea);
    let _ = writeln!(out, "Run:  {} ({})", eval.run_id, eval.evaluated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "{}", RULE);

    let _ = writeln!(out, "Overall score:         {}", percent(eval.overall_score));
    let _ = writeln!(out, "Market potential:      {}", percent(eval.market_potential));
    let _ = writeln!(out, "Technical feasibility: {}", percent(eval.technical_feasibility));
    let _ = writeln!(out, "Innovation potential:  {}", percent(eval.innovation_potential));

    let _ = writeln!(out, "\nScore buckets:");
    for bucket in ScoreBucket::all() {
        let _ = writeln!(out, "  {:<34} {}", bucket.label(), percent(eval.bucket(*bucket)));
    }

    section(&mut out, "Key insights", &eval.key_insights);
    section(&mut out, "Potential risks", &eval.potential_risks);

    let heading = match eval.recommendation_source {
        RecommendationSource::Advisor => "Recommendations (advisor)",
        RecommendationSource::Synthesized => "Recommendations (synthesized)",
        RecommendationSource::Generic => "Recommendations (generic)",
    };
    section(&mut out, heading, &eval.recommendations);

    if let Some(ref rec) = eval.project_recommendation {
        let _ = writeln!(out, "\n{}", RULE);
        let verdict = if rec.pursue_project { "PURSUE" } else { "DO NOT PURSUE" };
        let _ = writeln!(out, "Verdict: {} (confidence {})", verdict, percent(rec.confidence_score));
        section(&mut out, "Key factors", &rec.key_factors);
        section(&mut out, "Resource requirements", &rec.resource_requirements);

        let _ = writeln!(out, "\nTimeline ({}):", rec.timeline.total_duration);
        for (i, phase) in rec.timeline.phases().iter().enumerate() {
            let _ = writeln!(out, "  Phase {}: {}", i + 1, phase);
        }
        section(&mut out, "Milestones", &rec.timeline.key_milestones);
        if !rec.pursue_project {
            section(&mut out, "Alternatives", &rec.alternative_suggestions);
        }
    }

    let _ = writeln!(out, "\n{}", RULE);
    let _ = writeln!(out, "Personas:");
    for slot in &eval.persona_signals {
        let status = match &slot.signal {
            None => "absent".to_string(),
            Some(record) if record.is_degraded() => "degraded".to_string(),
            Some(SignalRecord::Assessment(signal)) => {
                let scores: Vec<String> = signal
                    .scores
                    .iter()
                    .map(|(name, v)| format!("{}={:.2}", name, v))
                    .collect();
                scores.join(", ")
            }
            Some(SignalRecord::Recommendation(_)) => "recommendation".to_string(),
        };
        let _ = writeln!(out, "  {:<18} {}", slot.persona_id, status);
    }

    out
}

fn section(out: &mut String, title: &str, items: &[String]) {
    let _ = writeln!(out, "\n{}:", title);
    if items.is_empty() {
        let _ = writeln!(out, "  (none)");
        return;
    }
    for item in items {
        let _ = writeln!(out, "  - {}", item);
    }
}

fn percent(score: f64) -> String {
    format!("{:>5.1}%", score * 100.0)
}

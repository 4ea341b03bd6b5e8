//! Evaluator/Router (spec component C5): batches raw candidates through a
//! lightweight or flagship model per the job's routing policy, tiers them,
//! and produces persisted entities.

use std::sync::Arc;

use tracing::{instrument, warn};
use uuid::Uuid;

use claw_config::{RoutingPolicy, UncertaintyBand};
use claw_core::model::{Claim, Concept, EvidenceSpan, JargonTerm, Person, Tier};
use claw_llm::{CancelToken, GenerateRequest, LlmAdapter, ModelUri, ResponseFormat};
use claw_schema::{build_repair_prompt, validate, SchemaName};

use crate::prompt::build_evaluator_prompt;
use crate::rubric::{tier_claim, tier_concept, tier_jargon, tier_person};
use crate::types::{Outcome, PendingCandidate, RawTier, Verdict};
use crate::EvaluatorError;

/// Parameters shared by every batch call this evaluator makes for one job run.
#[derive(Clone)]
pub struct EvaluatorContext {
    pub job_run_id: String,
    pub episode_title: String,
    pub lightweight_model: ModelUri,
    pub flagship_model: ModelUri,
    pub uncertainty_band: UncertaintyBand,
    pub batch_size: usize,
    pub temperature: f64,
    pub request_timeout_s: u64,
}

pub struct Evaluator {
    adapter: Arc<LlmAdapter>,
}

impl Evaluator {
    pub fn new(adapter: Arc<LlmAdapter>) -> Self {
        Self { adapter }
    }

    /// Runs one batch of candidates through `model`, validating (with one
    /// repair attempt) and parsing verdicts keyed by the batch-local index.
    async fn call_batch(
        &self,
        ctx: &EvaluatorContext,
        kind: &str,
        model: &ModelUri,
        batch: &[PendingCandidate],
        cancel: &CancelToken,
    ) -> Option<Vec<Verdict>> {
        let prompt = build_evaluator_prompt(kind, &ctx.episode_title, batch);
        let request = GenerateRequest::new(model.clone(), prompt)
            .with_temperature(ctx.temperature)
            .with_response_format(ResponseFormat::Json)
            .with_timeout_s(ctx.request_timeout_s);

        let first = self.adapter.generate(&ctx.job_run_id, request.clone(), cancel).await.ok()?;

        if let Some(verdicts) = self.parse_verdicts(&first.text, batch.len()) {
            return Some(verdicts);
        }

        let repair_prompt = build_repair_prompt(SchemaName::EvaluatorBatch, &first.text, &[]);
        let repair_request = GenerateRequest::new(model.clone(), repair_prompt)
            .with_temperature(ctx.temperature)
            .with_response_format(ResponseFormat::Json)
            .with_timeout_s(ctx.request_timeout_s);
        let repaired = self.adapter.generate(&ctx.job_run_id, repair_request, cancel).await.ok()?;
        self.parse_verdicts(&repaired.text, batch.len())
    }

    fn parse_verdicts(&self, text: &str, expected_len: usize) -> Option<Vec<Verdict>> {
        let obj: serde_json::Value = serde_json::from_str(text).ok()?;
        validate(SchemaName::EvaluatorBatch, &obj).ok()?;

        let results = obj.get("results")?.as_array()?;
        let mut verdicts = vec![None; expected_len];
        for entry in results {
            let idx = entry.get("ref")?.as_u64()? as usize;
            if idx >= expected_len {
                continue;
            }
            let score = entry.get("score")?.as_f64()?;
            let tier_hint = RawTier::parse(entry.get("tier")?.as_str()?);
            let uncertain = entry.get("uncertain")?.as_bool()?;
            let rationale = entry.get("rationale")?.as_str()?.to_string();
            let evidence = entry
                .get("evidence")?
                .as_array()?
                .iter()
                .filter_map(|e| {
                    let start = e.get("char_start")?.as_i64()?;
                    let end = e.get("char_end")?.as_i64()?;
                    Some((start, end))
                })
                .collect();
            verdicts[idx] = Some(Verdict { score, tier_hint, uncertain, rationale, evidence });
        }
        verdicts.into_iter().collect()
    }

    /// Runs `candidates` through the routed model(s), returning one verdict
    /// per candidate in input order. A batch that fails after retries and one
    /// repair attempt yields `None` for every member of that batch; callers
    /// persist those as tier-C "evaluator_unreachable" rather than dropping
    /// them (spec §4.5 "Failure").
    async fn route_and_evaluate(
        &self,
        ctx: &EvaluatorContext,
        kind: &str,
        policy: RoutingPolicy,
        candidates: &[PendingCandidate],
        cancel: &CancelToken,
    ) -> Vec<Option<Verdict>> {
        let mut results: Vec<Option<Verdict>> = vec![None; candidates.len()];

        let primary_model = match policy {
            RoutingPolicy::Flagship => &ctx.flagship_model,
            RoutingPolicy::Lightweight | RoutingPolicy::Dual => &ctx.lightweight_model,
        };

        for chunk_start in (0..candidates.len()).step_by(ctx.batch_size.max(1)) {
            let chunk_end = (chunk_start + ctx.batch_size.max(1)).min(candidates.len());
            let chunk = &candidates[chunk_start..chunk_end];
            if let Some(verdicts) = self.call_batch(ctx, kind, primary_model, chunk, cancel).await {
                for (offset, verdict) in verdicts.into_iter().enumerate() {
                    results[chunk_start + offset] = Some(verdict);
                }
            } else {
                warn!(kind, chunk_start, "evaluator batch failed after retries and repair");
            }
        }

        if policy == RoutingPolicy::Dual {
            let promote_indices: Vec<usize> = results
                .iter()
                .enumerate()
                .filter_map(|(i, v)| match v {
                    Some(v) if v.uncertain || ctx.uncertainty_band.contains(v.score) => Some(i),
                    _ => None,
                })
                .collect();

            if !promote_indices.is_empty() {
                let promoted_candidates: Vec<PendingCandidate> =
                    promote_indices.iter().map(|&i| candidates[i].clone()).collect();
                for chunk_start in (0..promoted_candidates.len()).step_by(ctx.batch_size.max(1)) {
                    let chunk_end = (chunk_start + ctx.batch_size.max(1)).min(promoted_candidates.len());
                    let chunk = &promoted_candidates[chunk_start..chunk_end];
                    if let Some(verdicts) = self.call_batch(ctx, kind, &ctx.flagship_model, chunk, cancel).await {
                        for (offset, verdict) in verdicts.into_iter().enumerate() {
                            results[promote_indices[chunk_start + offset]] = Some(verdict);
                        }
                    }
                }
            }
        }

        results
    }

    #[instrument(skip(self, ctx, candidates, cancel))]
    pub async fn evaluate_claims(
        &self,
        ctx: &EvaluatorContext,
        episode_id: &str,
        policy: RoutingPolicy,
        candidates: Vec<PendingCandidate>,
        cancel: &CancelToken,
    ) -> Result<Vec<(Claim, Vec<EvidenceSpan>)>, EvaluatorError> {
        let verdicts = self.route_and_evaluate(ctx, "claim", policy, &candidates, cancel).await;
        let mut accepted: Vec<(Claim, Vec<EvidenceSpan>)> = Vec::new();
        let mut failed_unreachable = 0usize;

        for (candidate, verdict) in candidates.iter().zip(verdicts.iter()) {
            let outcome = match verdict {
                Some(v) => tier_claim(candidate, v),
                None => {
                    failed_unreachable += 1;
                    Outcome::Accepted {
                        tier: Tier::C,
                        scoring_json: serde_json::json!({ "reason": "evaluator_unreachable" }),
                        evidence: vec![(candidate.char_start, candidate.char_end)],
                    }
                }
            };

            if let Outcome::Accepted { tier, scoring_json, evidence } = outcome {
                let claim_id = Uuid::new_v4().to_string();
                let spans = evidence
                    .into_iter()
                    .map(|(start, end)| EvidenceSpan {
                        span_id: Uuid::new_v4().to_string(),
                        claim_id: claim_id.clone(),
                        segment_id: candidate.segment_id.clone(),
                        char_start: start,
                        char_end: end,
                        quote: candidate.raw_text.clone(),
                    })
                    .collect();
                accepted.push((
                    Claim {
                        claim_id,
                        episode_id: episode_id.to_string(),
                        segment_id: candidate.segment_id.clone(),
                        canonical_text: candidate.canonical_text.clone(),
                        raw_text: candidate.raw_text.clone(),
                        tier,
                        scoring_json,
                        created_at: chrono::Utc::now(),
                    },
                    spans,
                ));
            }
        }

        if failed_unreachable > 0 {
            warn!(failed_unreachable, "claims persisted as degraded tier-C after evaluator outage");
        }

        Ok(merge_duplicate_claims(accepted))
    }

    #[instrument(skip(self, ctx, candidates, cancel))]
    pub async fn evaluate_people(
        &self,
        ctx: &EvaluatorContext,
        episode_id: &str,
        policy: RoutingPolicy,
        candidates: Vec<PendingCandidate>,
        cancel: &CancelToken,
    ) -> Result<Vec<Person>, EvaluatorError> {
        let verdicts = self.route_and_evaluate(ctx, "person", policy, &candidates, cancel).await;
        let mut accepted = Vec::new();
        for (candidate, verdict) in candidates.iter().zip(verdicts.iter()) {
            let outcome = match verdict {
                Some(v) => tier_person(candidate, v),
                None => Outcome::Rejected,
            };
            if let Outcome::Accepted { .. } = outcome {
                accepted.push(Person {
                    person_id: Uuid::new_v4().to_string(),
                    episode_id: episode_id.to_string(),
                    display_name: candidate.canonical_text.clone(),
                    role: candidate.extra.get("role").and_then(|v| v.as_str()).map(String::from),
                    mentions_json: serde_json::json!([{ "segment_id": candidate.segment_id, "char_start": candidate.char_start, "char_end": candidate.char_end }]),
                    description: None,
                });
            }
        }
        Ok(accepted)
    }

    #[instrument(skip(self, ctx, candidates, cancel))]
    pub async fn evaluate_concepts(
        &self,
        ctx: &EvaluatorContext,
        episode_id: &str,
        policy: RoutingPolicy,
        candidates: Vec<PendingCandidate>,
        cancel: &CancelToken,
    ) -> Result<Vec<Concept>, EvaluatorError> {
        let verdicts = self.route_and_evaluate(ctx, "concept", policy, &candidates, cancel).await;
        let mut accepted = Vec::new();
        for (candidate, verdict) in candidates.iter().zip(verdicts.iter()) {
            let outcome = match verdict {
                Some(v) => tier_concept(candidate, v),
                None => Outcome::Rejected,
            };
            if let Outcome::Accepted { evidence, .. } = outcome {
                accepted.push(Concept {
                    concept_id: Uuid::new_v4().to_string(),
                    episode_id: episode_id.to_string(),
                    name: candidate.canonical_text.clone(),
                    definition: candidate
                        .extra
                        .get("definition")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    first_segment_id: candidate.segment_id.clone(),
                    supporting_evidence_json: serde_json::json!(evidence),
                });
            }
        }
        Ok(accepted)
    }

    #[instrument(skip(self, ctx, candidates, cancel))]
    pub async fn evaluate_jargon(
        &self,
        ctx: &EvaluatorContext,
        episode_id: &str,
        policy: RoutingPolicy,
        candidates: Vec<PendingCandidate>,
        cancel: &CancelToken,
    ) -> Result<Vec<JargonTerm>, EvaluatorError> {
        let verdicts = self.route_and_evaluate(ctx, "jargon", policy, &candidates, cancel).await;
        let mut accepted = Vec::new();
        for (candidate, verdict) in candidates.iter().zip(verdicts.iter()) {
            let outcome = match verdict {
                Some(v) => tier_jargon(candidate, v),
                None => Outcome::Rejected,
            };
            if let Outcome::Accepted { .. } = outcome {
                accepted.push(JargonTerm {
                    jargon_id: Uuid::new_v4().to_string(),
                    episode_id: episode_id.to_string(),
                    term: candidate.canonical_text.clone(),
                    definition: candidate
                        .extra
                        .get("definition")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    first_segment_id: candidate.segment_id.clone(),
                });
            }
        }
        Ok(accepted)
    }
}

/// Merges claims sharing canonical text: keeps the earliest-segment
/// occurrence's tier/scoring, unions the evidence spans (spec §4.5
/// "Tie-breaks").
fn merge_duplicate_claims(mut claims: Vec<(Claim, Vec<EvidenceSpan>)>) -> Vec<(Claim, Vec<EvidenceSpan>)> {
    use std::collections::HashMap;

    let mut by_text: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<(Claim, Vec<EvidenceSpan>)> = Vec::new();

    claims.sort_by(|a, b| a.0.segment_id.cmp(&b.0.segment_id));

    for (claim, spans) in claims.drain(..) {
        if let Some(&idx) = by_text.get(&claim.canonical_text) {
            for span in spans {
                merged[idx].1.push(EvidenceSpan { claim_id: merged[idx].0.claim_id.clone(), ..span });
            }
        } else {
            by_text.insert(claim.canonical_text.clone(), merged.len());
            merged.push((claim, spans));
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claim(id: &str, segment_id: &str, text: &str) -> (Claim, Vec<EvidenceSpan>) {
        (
            Claim {
                claim_id: id.to_string(),
                episode_id: "ep-1".to_string(),
                segment_id: segment_id.to_string(),
                canonical_text: text.to_string(),
                raw_text: text.to_string(),
                tier: Tier::B,
                scoring_json: serde_json::json!({}),
                created_at: chrono::Utc::now(),
            },
            vec![],
        )
    }

    #[test]
    fn merge_combines_duplicate_canonical_text() {
        let claims = vec![
            sample_claim("c1", "seg-1", "the market will rise"),
            sample_claim("c2", "seg-0", "the market will rise"),
        ];
        let merged = merge_duplicate_claims(claims);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].0.segment_id, "seg-0");
    }

    #[test]
    fn merge_keeps_distinct_claims_separate() {
        let claims = vec![
            sample_claim("c1", "seg-0", "claim one"),
            sample_claim("c2", "seg-1", "claim two"),
        ];
        assert_eq!(merge_duplicate_claims(claims).len(), 2);
    }
}

use std::time::Instant;

use serde::Deserialize;

use atlas_domain::{
	evidence::truncate_chars,
	grounding::{Claim, GroundingReport, GroundingSource, Verdict},
};

use crate::{
	AtlasService, ServiceResult,
	agent::{
		state::{PipelineState, TraceEntry},
		strip_code_fences,
	},
};

#[derive(Debug, Deserialize)]
struct GroundingOutput {
	claims: Vec<RawClaim>,
}

#[derive(Debug, Deserialize)]
struct RawClaim {
	claim: String,
	#[serde(alias = "status")]
	verdict: Verdict,
	#[serde(default)]
	source: Option<String>,
}

impl AtlasService {
	/// Scores the answer against the same evidence slice the generator saw,
	/// with each passage truncated to bound the audit prompt.
	pub(crate) async fn verify(&self, state: &mut PipelineState) -> ServiceResult<()> {
		let cfg = &self.cfg.providers.grounding;
		let started = Instant::now();
		let snippet_chars = self.cfg.agent.evidence_snippet_chars as usize;
		let sources: Vec<GroundingSource> = state
			.context_evidence(self.cfg.agent.max_context_items)
			.iter()
			.map(|item| GroundingSource {
				api_name: item.metadata.api_name.clone(),
				text: truncate_chars(&item.text, snippet_chars),
			})
			.collect();
		let completion = self.providers.grounding.check(cfg, &state.answer, &sources).await?;

		state.grounding = parse_grounding_report(&completion.text);
		state.trace.push(TraceEntry::Verify {
			grounding_score: state.grounding.score,
			supported: state.grounding.supported_count,
			total: state.grounding.total_count,
			model: cfg.model.clone(),
			elapsed_ms: started.elapsed().as_millis() as u64,
		});

		Ok(())
	}
}

/// The score is recomputed from the decoded claim list; the model's own
/// arithmetic is ignored. Unparseable output yields the conservative empty
/// report, which triggers refinement whenever retries are enabled.
pub(crate) fn parse_grounding_report(raw: &str) -> GroundingReport {
	match serde_json::from_str::<GroundingOutput>(&strip_code_fences(raw)) {
		Ok(output) => GroundingReport::from_claims(
			output
				.claims
				.into_iter()
				.map(|raw| Claim { claim: raw.claim, verdict: raw.verdict, source: raw.source })
				.collect(),
		),
		Err(_) => GroundingReport::empty(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn computes_the_score_from_claims() {
		let raw = r#"{
			"claims": [
				{"claim": "a", "verdict": "SUPPORTED", "source": "Source 1"},
				{"claim": "b", "verdict": "UNSUPPORTED", "source": null},
				{"claim": "c", "verdict": "PARTIAL", "source": "Source 2"},
				{"claim": "d", "verdict": "SUPPORTED", "source": "Source 1"}
			]
		}"#;
		let report = parse_grounding_report(raw);

		assert_eq!(report.total_count, 4);
		assert_eq!(report.supported_count, 2);
		assert!((report.score - 0.5).abs() < f32::EPSILON);
	}

	#[test]
	fn ignores_model_reported_arithmetic() {
		let raw = r#"{
			"claims": [{"claim": "a", "verdict": "UNSUPPORTED", "source": null}],
			"supported_count": 99,
			"grounding_score": 1.0
		}"#;
		let report = parse_grounding_report(raw);

		assert_eq!(report.score, 0.0);
		assert_eq!(report.supported_count, 0);
	}

	#[test]
	fn accepts_the_legacy_status_field() {
		let raw = r#"{"claims": [{"claim": "a", "status": "SUPPORTED"}]}"#;
		let report = parse_grounding_report(raw);

		assert_eq!(report.supported_count, 1);
	}

	#[test]
	fn unparseable_output_yields_the_empty_report() {
		let report = parse_grounding_report("I could not check the claims.");

		assert_eq!(report.score, 0.0);
		assert_eq!(report.total_count, 0);
		assert!(report.claims.is_empty());
	}

	#[test]
	fn unknown_verdicts_fail_the_whole_decode() {
		let raw = r#"{"claims": [{"claim": "a", "verdict": "MAYBE"}]}"#;
		let report = parse_grounding_report(raw);

		assert!(report.claims.is_empty());
	}
}

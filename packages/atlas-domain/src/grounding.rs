use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
	Supported,
	Unsupported,
	Partial,
}

/// One factual claim extracted from a generated answer, judged against the
/// evidence that produced the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
	pub claim: String,
	pub verdict: Verdict,
	pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingReport {
	pub score: f32,
	pub supported_count: u32,
	pub total_count: u32,
	pub claims: Vec<Claim>,
}
impl GroundingReport {
	/// Counts are derived from the claim list; the score is
	/// `supported / total`, or 0 when no claims were extracted.
	pub fn from_claims(claims: Vec<Claim>) -> Self {
		let total_count = claims.len() as u32;
		let supported_count =
			claims.iter().filter(|claim| claim.verdict == Verdict::Supported).count() as u32;
		let score = if total_count == 0 {
			0.0
		} else {
			supported_count as f32 / total_count as f32
		};

		Self { score, supported_count, total_count, claims }
	}

	/// Conservative fail-safe: no claims, score 0.
	pub fn empty() -> Self {
		Self::from_claims(Vec::new())
	}

	pub fn unsupported_claims(&self) -> Vec<String> {
		self.claims
			.iter()
			.filter(|claim| claim.verdict == Verdict::Unsupported)
			.map(|claim| claim.claim.clone())
			.collect()
	}
}

/// The evidence slice handed to the grounding scorer.
#[derive(Debug, Clone, Serialize)]
pub struct GroundingSource {
	pub api_name: String,
	pub text: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn claim(text: &str, verdict: Verdict) -> Claim {
		Claim { claim: text.to_string(), verdict, source: None }
	}

	#[test]
	fn score_is_supported_over_total() {
		let report = GroundingReport::from_claims(vec![
			claim("a", Verdict::Supported),
			claim("b", Verdict::Unsupported),
			claim("c", Verdict::Partial),
			claim("d", Verdict::Supported),
		]);

		assert_eq!(report.supported_count, 2);
		assert_eq!(report.total_count, 4);
		assert!((report.score - 0.5).abs() < f32::EPSILON);
	}

	#[test]
	fn empty_report_scores_zero() {
		let report = GroundingReport::empty();

		assert_eq!(report.score, 0.0);
		assert!(report.claims.is_empty());
	}

	#[test]
	fn partial_claims_are_not_refinement_targets() {
		let report = GroundingReport::from_claims(vec![
			claim("supported", Verdict::Supported),
			claim("unsupported", Verdict::Unsupported),
			claim("partial", Verdict::Partial),
		]);

		assert_eq!(report.unsupported_claims(), vec!["unsupported".to_string()]);
	}

	#[test]
	fn verdict_uses_screaming_snake_case() {
		let parsed: Verdict = serde_json::from_str("\"UNSUPPORTED\"").expect("parse failed");

		assert_eq!(parsed, Verdict::Unsupported);
	}
}

use std::time::Instant;

use serde_json::Value;

use crate::{
	AtlasService, ServiceResult,
	agent::{
		decompose::parse_sub_queries,
		state::{PipelineState, TraceEntry},
	},
};

const REFINE_SYSTEM_PROMPT: &str = "The previous search didn't return well-grounded results.
Based on the unsupported claims, generate 2-3 refined search queries that might find better \
sources. Respond with ONLY a JSON array: [\"refined query 1\", \"refined query 2\"]";

impl AtlasService {
	/// Replaces the active sub-queries with ones targeting the claims the
	/// verifier could not support. PARTIAL claims are not refinement
	/// targets. Malformed output degrades to a plain re-retrieval of the
	/// original query.
	pub(crate) async fn refine(&self, state: &mut PipelineState) -> ServiceResult<()> {
		let cfg = &self.cfg.providers.completion;
		let started = Instant::now();

		state.retry_count += 1;

		let unsupported = state.grounding.unsupported_claims();
		let messages = build_refine_messages(&state.query, &unsupported);
		let completion = self.providers.completion.complete(cfg, &messages, None).await?;
		let refined =
			parse_sub_queries(&completion.text, &state.query, self.cfg.agent.max_sub_queries);
		let reason = format!(
			"grounding score {:.2} below threshold {:.2}",
			state.grounding.score, self.cfg.agent.grounding_threshold,
		);

		state.sub_queries = refined.clone();
		state.trace.push(TraceEntry::Refine {
			reason,
			refined_queries: refined,
			retry: state.retry_count,
			model: cfg.model.clone(),
			elapsed_ms: started.elapsed().as_millis() as u64,
		});

		Ok(())
	}
}

pub(crate) fn build_refine_messages(query: &str, unsupported: &[String]) -> Vec<Value> {
	let claims = serde_json::to_string(unsupported).unwrap_or_else(|_| "[]".to_string());
	let user = format!("Original query: {query}\nUnsupported claims: {claims}");

	vec![
		serde_json::json!({ "role": "system", "content": REFINE_SYSTEM_PROMPT }),
		serde_json::json!({ "role": "user", "content": user }),
	]
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn refine_prompt_carries_the_unsupported_claims() {
		let unsupported =
			vec!["Authentiq supports SAML".to_string(), "Twilio is free".to_string()];
		let messages = build_refine_messages("compare auth APIs", &unsupported);
		let user = messages[1]["content"].as_str().expect("user prompt must be text");

		assert!(user.starts_with("Original query: compare auth APIs"));
		assert!(user.contains("Authentiq supports SAML"));
		assert!(user.contains("Twilio is free"));
	}
}

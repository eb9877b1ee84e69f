use std::time::Instant;

use serde::Deserialize;
use serde_json::Value;

use atlas_domain::query::QueryType;

use crate::{
	AtlasService, ServiceResult,
	agent::{
		state::{PipelineState, TraceEntry},
		strip_code_fences,
	},
};

const CLASSIFY_SYSTEM_PROMPT: &str = "Classify the user query into one of these types:
- SIMPLE: Single straightforward question about one API or topic
- COMPARE: Asks to compare multiple APIs or find the best option with multiple criteria
- EXPLORE: Open-ended exploration of what's available

Respond with ONLY the type in JSON: {\"type\": \"SIMPLE\"} or {\"type\": \"COMPARE\"} or {\"type\": \"EXPLORE\"}";

#[derive(Debug, Deserialize)]
struct Classification {
	#[serde(rename = "type")]
	query_type: QueryType,
}

impl AtlasService {
	pub(crate) async fn classify(&self, state: &mut PipelineState) -> ServiceResult<()> {
		let cfg = &self.cfg.providers.completion_fast;
		let started = Instant::now();
		let messages = build_classify_messages(&state.query);
		let completion = self.providers.completion.complete(cfg, &messages, None).await?;
		let query_type = parse_query_type(&completion.text);

		state.query_type = Some(query_type);
		state.trace.push(TraceEntry::Classify {
			result: query_type,
			model: cfg.model.clone(),
			elapsed_ms: started.elapsed().as_millis() as u64,
		});

		Ok(())
	}
}

pub(crate) fn build_classify_messages(query: &str) -> Vec<Value> {
	vec![
		serde_json::json!({ "role": "system", "content": CLASSIFY_SYSTEM_PROMPT }),
		serde_json::json!({ "role": "user", "content": query }),
	]
}

/// Malformed model output degrades to `SIMPLE`; classification never fails
/// the run.
pub(crate) fn parse_query_type(raw: &str) -> QueryType {
	serde_json::from_str::<Classification>(&strip_code_fences(raw))
		.map(|classification| classification.query_type)
		.unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_the_three_types() {
		assert_eq!(parse_query_type(r#"{"type": "SIMPLE"}"#), QueryType::Simple);
		assert_eq!(parse_query_type(r#"{"type": "COMPARE"}"#), QueryType::Compare);
		assert_eq!(parse_query_type(r#"{"type": "EXPLORE"}"#), QueryType::Explore);
	}

	#[test]
	fn parses_fenced_output() {
		assert_eq!(parse_query_type("```json\n{\"type\": \"COMPARE\"}\n```"), QueryType::Compare);
	}

	#[test]
	fn malformed_output_falls_back_to_simple() {
		assert_eq!(parse_query_type("the query looks simple to me"), QueryType::Simple);
		assert_eq!(parse_query_type(r#"{"type": "SOMETHING_ELSE"}"#), QueryType::Simple);
		assert_eq!(parse_query_type(""), QueryType::Simple);
	}
}

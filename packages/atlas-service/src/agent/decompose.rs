use std::{collections::HashSet, time::Instant};

use serde_json::Value;

use crate::{
	AtlasService, ServiceResult,
	agent::{
		state::{PipelineState, TraceEntry},
		strip_code_fences,
	},
};

const DECOMPOSE_SYSTEM_PROMPT: &str = "Break this query into 2-4 short sub-queries for semantic \
search. Each sub-query must be under 8 words. Respond with ONLY a JSON array: \
[\"sub query 1\", \"sub query 2\"]";

impl AtlasService {
	pub(crate) async fn decompose(&self, state: &mut PipelineState) -> ServiceResult<()> {
		let started = Instant::now();

		// Classification already ruled out decomposition for SIMPLE queries.
		if state.query_type.unwrap_or_default().is_simple() {
			state.sub_queries = vec![state.query.clone()];
			state.trace.push(TraceEntry::Decompose {
				sub_queries: state.sub_queries.clone(),
				model: None,
				elapsed_ms: started.elapsed().as_millis() as u64,
			});

			return Ok(());
		}

		let cfg = &self.cfg.providers.completion_fast;
		let messages = build_decompose_messages(&state.query);
		let completion = self.providers.completion.complete(cfg, &messages, None).await?;

		state.sub_queries =
			parse_sub_queries(&completion.text, &state.query, self.cfg.agent.max_sub_queries);
		state.trace.push(TraceEntry::Decompose {
			sub_queries: state.sub_queries.clone(),
			model: Some(cfg.model.clone()),
			elapsed_ms: started.elapsed().as_millis() as u64,
		});

		Ok(())
	}
}

pub(crate) fn build_decompose_messages(query: &str) -> Vec<Value> {
	vec![
		serde_json::json!({ "role": "system", "content": DECOMPOSE_SYSTEM_PROMPT }),
		serde_json::json!({ "role": "user", "content": query }),
	]
}

/// Decodes a JSON array of sub-queries. Malformed output, or output that
/// normalizes to nothing, falls back to the original query so retrieval
/// always has at least one query to run.
pub(crate) fn parse_sub_queries(raw: &str, original: &str, max_sub_queries: u32) -> Vec<String> {
	let Ok(parsed) = serde_json::from_str::<Vec<String>>(&strip_code_fences(raw)) else {
		return vec![original.to_string()];
	};
	let normalized = normalize_sub_queries(parsed, max_sub_queries);

	if normalized.is_empty() { vec![original.to_string()] } else { normalized }
}

fn normalize_sub_queries(queries: Vec<String>, max_sub_queries: u32) -> Vec<String> {
	let mut out = Vec::new();
	let mut seen = HashSet::new();

	for query in queries {
		if out.len() >= max_sub_queries as usize {
			break;
		}

		let trimmed = query.trim();

		if trimmed.is_empty() {
			continue;
		}

		if seen.insert(trimmed.to_lowercase()) {
			out.push(trimmed.to_string());
		}
	}

	out
}

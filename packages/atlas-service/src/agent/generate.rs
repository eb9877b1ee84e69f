use std::time::Instant;

use serde_json::Value;

use atlas_domain::{
	evidence::{EvidenceItem, ItemKind},
	query::QueryType,
};

use crate::{
	AtlasService, ServiceResult,
	agent::state::{PipelineState, TraceEntry},
};

const GENERATE_SYSTEM_PROMPT: &str = "You are Atlas, an AI-powered API discovery assistant.
Rules:
- Only use information from the provided search results.
- Cite which source each claim comes from using [Source N].
- Be honest when information is missing.
- Be concise and practical.";

const COMPARE_FORMAT_PROMPT: &str = "
For this COMPARISON query, use this exact format:
1. One intro sentence.
2. A markdown table with EXACTLY these 4 columns: | API | Key Capability | Support | Notes |
   - Keep each cell under 8 words.
   - Use Yes/No/Partial for the Support column.
3. A final section starting with **Recommendation:** giving a clear pick with caveats.

Do NOT include source numbers, endpoints, or URLs in the table. Keep it scannable.";

impl AtlasService {
	pub(crate) async fn generate(&self, state: &mut PipelineState) -> ServiceResult<()> {
		let cfg = &self.cfg.providers.completion;
		let started = Instant::now();
		let evidence = state.context_evidence(self.cfg.agent.max_context_items);
		let messages =
			build_generate_messages(&state.query, state.query_type.unwrap_or_default(), evidence);
		let completion = self
			.providers
			.completion
			.complete(cfg, &messages, Some(self.cfg.agent.max_answer_tokens))
			.await?;

		state.answer = completion.text;
		state.trace.push(TraceEntry::Generate {
			tokens: completion.completion_tokens,
			model: cfg.model.clone(),
			elapsed_ms: started.elapsed().as_millis() as u64,
		});

		Ok(())
	}
}

pub(crate) fn build_generate_messages(
	query: &str,
	query_type: QueryType,
	evidence: &[EvidenceItem],
) -> Vec<Value> {
	let mut system = GENERATE_SYSTEM_PROMPT.to_string();

	if query_type == QueryType::Compare {
		system.push_str(COMPARE_FORMAT_PROMPT);
	}

	let context = build_context(evidence);
	let user = format!("Search results:\n{context}\n\nUser question: {query}");

	vec![
		serde_json::json!({ "role": "system", "content": system }),
		serde_json::json!({ "role": "user", "content": user }),
	]
}

/// Numbered source blocks; the numbering is what answer citations refer to.
pub(crate) fn build_context(evidence: &[EvidenceItem]) -> String {
	let mut parts = Vec::with_capacity(evidence.len());

	for (i, item) in evidence.iter().enumerate() {
		let mut part = format!("[Source {}] API: {}\n", i + 1, item.metadata.api_name);

		if item.metadata.kind == ItemKind::Endpoint {
			part.push_str(&format!(
				"Endpoint: {} {}\n",
				item.metadata.method.as_deref().unwrap_or(""),
				item.metadata.path.as_deref().unwrap_or(""),
			));
		}

		part.push_str(&format!("Content: {}\n", item.text));
		parts.push(part);
	}

	parts.join("\n---\n")
}

#[cfg(test)]
mod tests {
	use atlas_domain::evidence::EvidenceMetadata;

	use super::*;

	fn overview(text: &str, api_name: &str) -> EvidenceItem {
		EvidenceItem {
			text: text.to_string(),
			metadata: EvidenceMetadata {
				api_name: api_name.to_string(),
				kind: ItemKind::Overview,
				method: None,
				path: None,
				source_ref: serde_json::json!({}),
			},
			relevance_score: 0.9,
		}
	}

	fn endpoint(text: &str, api_name: &str, method: &str, path: &str) -> EvidenceItem {
		EvidenceItem {
			text: text.to_string(),
			metadata: EvidenceMetadata {
				api_name: api_name.to_string(),
				kind: ItemKind::Endpoint,
				method: Some(method.to_string()),
				path: Some(path.to_string()),
				source_ref: serde_json::json!({}),
			},
			relevance_score: 0.8,
		}
	}

	#[test]
	fn context_numbers_sources_and_shows_endpoints() {
		let context = build_context(&[
			overview("Strong authentication.", "Authentiq"),
			endpoint("push sign-in request", "Authentiq", "POST", "/login"),
		]);

		assert!(context.contains("[Source 1] API: Authentiq"));
		assert!(context.contains("[Source 2] API: Authentiq"));
		assert!(context.contains("Endpoint: POST /login"));
	}

	#[test]
	fn compare_queries_get_the_table_contract() {
		let messages =
			build_generate_messages("compare auth APIs", QueryType::Compare, &[overview("x", "A")]);
		let system = messages[0]["content"].as_str().expect("system prompt must be text");

		assert!(system.contains("| API | Key Capability | Support | Notes |"));
		assert!(system.contains("**Recommendation:**"));
	}

	#[test]
	fn other_query_types_stay_free_form() {
		let messages =
			build_generate_messages("what is Authentiq", QueryType::Simple, &[overview("x", "A")]);
		let system = messages[0]["content"].as_str().expect("system prompt must be text");

		assert!(!system.contains("| API | Key Capability | Support | Notes |"));
		assert!(system.contains("[Source N]"));
	}
}

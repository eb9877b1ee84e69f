use color_eyre::Result;
use serde_json::Value;

use atlas_domain::grounding::GroundingSource;

use crate::completion::{self, Completion};

const GROUNDING_SYSTEM_PROMPT: &str = "You are a grounding verification system. Your job is to \
check whether each claim in an AI-generated answer is supported by the provided source documents.

For each claim in the answer, determine if it is:
- SUPPORTED: Directly backed by information in the sources
- UNSUPPORTED: Not found in the sources
- PARTIAL: Loosely related but not directly stated

Respond in this exact JSON format:
{
  \"claims\": [
    {\"claim\": \"the claim text\", \"verdict\": \"SUPPORTED\", \"source\": \"which source\"},
    {\"claim\": \"the claim text\", \"verdict\": \"UNSUPPORTED\", \"source\": null}
  ]
}";

/// Audits `answer` against `sources` and returns the raw model output.
/// The caller owns the schema decode and its fail-safe default.
pub async fn check(
	cfg: &atlas_config::LlmProviderConfig,
	answer: &str,
	sources: &[GroundingSource],
) -> Result<Completion> {
	let messages = build_grounding_messages(answer, sources);

	completion::complete(cfg, &messages, None).await
}

pub fn build_grounding_messages(answer: &str, sources: &[GroundingSource]) -> Vec<Value> {
	let source_text = sources
		.iter()
		.enumerate()
		.map(|(i, source)| format!("[Source {}] {}: {}", i + 1, source.api_name, source.text))
		.collect::<Vec<_>>()
		.join("\n---\n");
	let user_prompt = format!("Sources:\n{source_text}\n\nAnswer to verify:\n{answer}");

	vec![
		serde_json::json!({ "role": "system", "content": GROUNDING_SYSTEM_PROMPT }),
		serde_json::json!({ "role": "user", "content": user_prompt }),
	]
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn numbers_sources_in_order() {
		let sources = vec![
			GroundingSource {
				api_name: "Authentiq".to_string(),
				text: "Strong authentication, without the passwords.".to_string(),
			},
			GroundingSource {
				api_name: "Twilio".to_string(),
				text: "Send SMS messages internationally.".to_string(),
			},
		];
		let messages = build_grounding_messages("answer text", &sources);
		let user = messages[1]["content"].as_str().expect("user prompt must be text");

		assert!(user.contains("[Source 1] Authentiq:"));
		assert!(user.contains("[Source 2] Twilio:"));
		assert!(user.ends_with("answer text"));
	}

	#[test]
	fn prompt_defines_all_three_verdicts() {
		let messages = build_grounding_messages("x", &[]);
		let system = messages[0]["content"].as_str().expect("system prompt must be text");

		for verdict in ["SUPPORTED", "UNSUPPORTED", "PARTIAL"] {
			assert!(system.contains(verdict));
		}
	}
}

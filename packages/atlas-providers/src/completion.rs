use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

/// One chat-completion result. Token counts default to zero when the
/// provider omits usage accounting.
#[derive(Debug, Clone, Serialize)]
pub struct Completion {
	pub text: String,
	pub prompt_tokens: u32,
	pub completion_tokens: u32,
}

pub async fn complete(
	cfg: &atlas_config::LlmProviderConfig,
	messages: &[Value],
	max_tokens: Option<u32>,
) -> Result<Completion> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let mut body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});

	if let Some(max_tokens) = max_tokens {
		body["max_completion_tokens"] = Value::from(max_tokens);
	}

	let res = client
		.post(&url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_completion_response(json)
}

fn parse_completion_response(json: Value) -> Result<Completion> {
	let text = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|content| content.as_str())
		.ok_or_else(|| eyre::eyre!("Completion response is missing message content."))?
		.to_string();
	let prompt_tokens = usage_count(&json, "prompt_tokens");
	let completion_tokens = usage_count(&json, "completion_tokens");

	Ok(Completion { text, prompt_tokens, completion_tokens })
}

fn usage_count(json: &Value, field: &str) -> u32 {
	json.get("usage").and_then(|usage| usage.get(field)).and_then(Value::as_u64).unwrap_or(0) as u32
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_content_and_usage() {
		let json = serde_json::json!({
			"choices": [{ "message": { "content": "Twilio supports SMS." } }],
			"usage": { "prompt_tokens": 120, "completion_tokens": 9 }
		});
		let completion = parse_completion_response(json).expect("parse failed");

		assert_eq!(completion.text, "Twilio supports SMS.");
		assert_eq!(completion.prompt_tokens, 120);
		assert_eq!(completion.completion_tokens, 9);
	}

	#[test]
	fn missing_usage_defaults_to_zero() {
		let json = serde_json::json!({
			"choices": [{ "message": { "content": "ok" } }]
		});
		let completion = parse_completion_response(json).expect("parse failed");

		assert_eq!(completion.completion_tokens, 0);
	}

	#[test]
	fn missing_content_is_an_error() {
		let json = serde_json::json!({ "choices": [] });

		assert!(parse_completion_response(json).is_err());
	}
}

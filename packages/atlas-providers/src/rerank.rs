use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

/// Scores `docs` against `query` with a cross-encoder rerank endpoint.
/// The returned vector is aligned with the input order; documents the
/// provider skipped keep a score of zero.
pub async fn rerank(
	cfg: &atlas_config::ProviderConfig,
	query: &str,
	docs: &[String],
) -> Result<Vec<f32>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"query": query,
		"documents": docs,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_rerank_response(json, docs.len())
}

fn parse_rerank_response(json: Value, doc_count: usize) -> Result<Vec<f32>> {
	let results = json
		.get("results")
		.or_else(|| json.get("data"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Rerank response is missing results array."))?;
	let mut scores = vec![0.0f32; doc_count];

	for item in results {
		let index = item
			.get("index")
			.and_then(Value::as_u64)
			.ok_or_else(|| eyre::eyre!("Rerank result is missing its document index."))?
			as usize;

		if index >= doc_count {
			return Err(eyre::eyre!("Rerank result index is out of range."));
		}

		scores[index] = item
			.get("relevance_score")
			.or_else(|| item.get("score"))
			.and_then(Value::as_f64)
			.ok_or_else(|| eyre::eyre!("Rerank result is missing its score."))?
			as f32;
	}

	Ok(scores)
}

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use atlas_domain::evidence::EvidenceItem;

use crate::{AtlasService, ServiceError, ServiceResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	pub top_k: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
	pub query: String,
	pub results: Vec<EvidenceItem>,
	pub count: u32,
}

impl AtlasService {
	/// Plain semantic lookup, with an optional cross-encoder rerank pass
	/// when `search.rerank_enabled` is set.
	pub async fn search(&self, req: SearchRequest) -> ServiceResult<SearchResponse> {
		let query = req.query.trim().to_string();

		if query.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "query must be non-empty.".to_string(),
			});
		}

		let top_k = req.top_k.unwrap_or(self.cfg.search.top_k).max(1);
		let mut results = self.providers.search.search(&query, top_k).await?;

		if self.cfg.search.rerank_enabled && !results.is_empty() {
			let docs: Vec<String> = results.iter().map(|item| item.text.clone()).collect();
			let scores =
				self.providers.rerank.rerank(&self.cfg.providers.rerank, &query, &docs).await?;

			results = rerank_order(results, &scores);
		}

		let count = results.len() as u32;

		Ok(SearchResponse { query, results, count })
	}
}

/// Reorders results by rerank score, highest first. Retrieval scores on the
/// items are left untouched.
pub(crate) fn rerank_order(results: Vec<EvidenceItem>, scores: &[f32]) -> Vec<EvidenceItem> {
	let mut paired: Vec<(f32, EvidenceItem)> = results
		.into_iter()
		.enumerate()
		.map(|(i, item)| (scores.get(i).copied().unwrap_or(0.0), item))
		.collect();

	paired.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(Ordering::Equal));

	paired.into_iter().map(|(_, item)| item).collect()
}

#[cfg(test)]
mod tests {
	use atlas_domain::evidence::{EvidenceMetadata, ItemKind};

	use super::*;

	fn item(text: &str, score: f32) -> EvidenceItem {
		EvidenceItem {
			text: text.to_string(),
			metadata: EvidenceMetadata {
				api_name: "API".to_string(),
				kind: ItemKind::Overview,
				method: None,
				path: None,
				source_ref: serde_json::json!({}),
			},
			relevance_score: score,
		}
	}

	#[test]
	fn orders_by_rerank_score_descending() {
		let results = vec![item("low", 0.9), item("high", 0.1), item("mid", 0.5)];
		let reranked = rerank_order(results, &[0.1, 0.95, 0.4]);
		let texts: Vec<&str> = reranked.iter().map(|item| item.text.as_str()).collect();

		assert_eq!(texts, vec!["high", "mid", "low"]);
	}

	#[test]
	fn missing_scores_sink_to_the_bottom() {
		let results = vec![item("scored", 0.2), item("unscored", 0.9)];
		let reranked = rerank_order(results, &[0.7]);

		assert_eq!(reranked[0].text, "scored");
	}

	#[test]
	fn retrieval_scores_are_preserved() {
		let results = vec![item("a", 0.33)];
		let reranked = rerank_order(results, &[0.99]);

		assert_eq!(reranked[0].relevance_score, 0.33);
	}
}

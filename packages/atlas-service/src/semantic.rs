use std::collections::HashMap;

use color_eyre::eyre;
use qdrant_client::qdrant::{Query, QueryPointsBuilder, ScoredPoint, Value, value::Kind};

use atlas_config::EmbeddingProviderConfig;
use atlas_domain::evidence::{EvidenceItem, EvidenceMetadata, ItemKind};
use atlas_providers::embedding;
use atlas_storage::qdrant::QdrantStore;

use crate::{BoxFuture, SearchProvider};

/// Default search collaborator: embeds the query and runs a nearest
/// neighbour lookup against the spec-chunk collection.
pub struct SemanticSearch {
	embedding: EmbeddingProviderConfig,
	qdrant: QdrantStore,
}
impl SemanticSearch {
	pub fn new(embedding: EmbeddingProviderConfig, qdrant: QdrantStore) -> Self {
		Self { embedding, qdrant }
	}

	async fn run(&self, query: &str, top_k: u32) -> color_eyre::Result<Vec<EvidenceItem>> {
		let texts = [query.to_string()];
		let vectors = embedding::embed(&self.embedding, &texts).await?;
		let vector = vectors
			.into_iter()
			.next()
			.ok_or_else(|| eyre::eyre!("Embedding provider returned no vectors."))?;

		if vector.len() != self.qdrant.vector_dim as usize {
			return Err(eyre::eyre!("Embedding vector dimension mismatch."));
		}

		let request = QueryPointsBuilder::new(self.qdrant.collection.clone())
			.query(Query::new_nearest(vector))
			.with_payload(true)
			.limit(top_k as u64);
		let response = self.qdrant.client.query(request).await?;

		Ok(response.result.into_iter().filter_map(evidence_from_point).collect())
	}
}
impl SearchProvider for SemanticSearch {
	fn search<'a>(
		&'a self,
		query: &'a str,
		top_k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<EvidenceItem>>> {
		Box::pin(self.run(query, top_k))
	}
}

/// Points without a text payload carry nothing citable and are skipped.
fn evidence_from_point(point: ScoredPoint) -> Option<EvidenceItem> {
	let text = payload_string(&point.payload, "text")?;
	let api_name =
		payload_string(&point.payload, "api_name").unwrap_or_else(|| "Unknown".to_string());
	let kind = match payload_string(&point.payload, "kind").as_deref() {
		Some("endpoint") => ItemKind::Endpoint,
		_ => ItemKind::Overview,
	};
	let method = payload_string(&point.payload, "method");
	let path = payload_string(&point.payload, "path");
	let source_ref = payload_string(&point.payload, "source_ref")
		.map(serde_json::Value::String)
		.unwrap_or(serde_json::Value::Null);

	Some(EvidenceItem {
		text,
		metadata: EvidenceMetadata { api_name, kind, method, path, source_ref },
		relevance_score: point.score,
	})
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	match &payload.get(key)?.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn string_value(text: &str) -> Value {
		Value { kind: Some(Kind::StringValue(text.to_string())) }
	}

	#[test]
	fn maps_endpoint_payloads() {
		let mut payload = HashMap::new();

		payload.insert("text".to_string(), string_value("push sign-in request"));
		payload.insert("api_name".to_string(), string_value("Authentiq"));
		payload.insert("kind".to_string(), string_value("endpoint"));
		payload.insert("method".to_string(), string_value("POST"));
		payload.insert("path".to_string(), string_value("/login"));

		let point = ScoredPoint { payload, score: 0.91, ..Default::default() };
		let item = evidence_from_point(point).expect("point must map to evidence");

		assert_eq!(item.metadata.kind, ItemKind::Endpoint);
		assert_eq!(item.metadata.method.as_deref(), Some("POST"));
		assert_eq!(item.relevance_score, 0.91);
	}

	#[test]
	fn points_without_text_are_skipped() {
		let mut payload = HashMap::new();

		payload.insert("api_name".to_string(), string_value("Authentiq"));

		let point = ScoredPoint { payload, score: 0.5, ..Default::default() };

		assert!(evidence_from_point(point).is_none());
	}
}

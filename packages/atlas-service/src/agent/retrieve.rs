use std::{collections::HashSet, time::Instant};

use atlas_domain::evidence::EvidenceItem;

use crate::{
	AtlasService, ServiceError, ServiceResult,
	agent::state::{PipelineState, TraceEntry},
};

impl AtlasService {
	/// Fans the sub-queries out to the search collaborator concurrently and
	/// merges the batches in sub-query submission order, regardless of
	/// completion order. A refinement pass appends onto the existing
	/// evidence set; it never discards prior evidence.
	pub(crate) async fn retrieve(&self, state: &mut PipelineState) -> ServiceResult<()> {
		let started = Instant::now();
		let top_k = self.cfg.agent.top_k_per_query;
		let mut handles = Vec::with_capacity(state.sub_queries.len());

		for sub_query in &state.sub_queries {
			let search = self.providers.search.clone();
			let sub_query = sub_query.clone();

			handles.push(tokio::spawn(async move { search.search(&sub_query, top_k).await }));
		}

		let mut batches = Vec::with_capacity(handles.len());

		for handle in handles {
			let batch = handle.await.map_err(|err| ServiceError::Provider {
				message: format!("Search task failed: {err}."),
			})??;

			batches.push(batch);
		}

		let new_results = merge_results(&mut state.evidence, batches);

		state.trace.push(TraceEntry::Retrieve {
			sub_queries: state.sub_queries.len() as u32,
			new_results,
			total_results: state.evidence.len() as u32,
			elapsed_ms: started.elapsed().as_millis() as u64,
		});

		Ok(())
	}
}

/// First-seen wins: when dedup keys collide, the item from the earlier
/// batch (and the earlier position within a batch) is the one retained.
pub(crate) fn merge_results(
	evidence: &mut Vec<EvidenceItem>,
	batches: Vec<Vec<EvidenceItem>>,
) -> u32 {
	let mut seen: HashSet<String> = evidence.iter().map(EvidenceItem::dedup_key).collect();
	let mut added = 0;

	for batch in batches {
		for item in batch {
			if seen.insert(item.dedup_key()) {
				evidence.push(item);
				added += 1;
			}
		}
	}

	added
}

#[cfg(test)]
mod tests {
	use atlas_domain::evidence::{EvidenceMetadata, ItemKind};

	use super::*;

	fn item(text: &str, api_name: &str, score: f32) -> EvidenceItem {
		EvidenceItem {
			text: text.to_string(),
			metadata: EvidenceMetadata {
				api_name: api_name.to_string(),
				kind: ItemKind::Overview,
				method: None,
				path: None,
				source_ref: serde_json::json!({}),
			},
			relevance_score: score,
		}
	}

	#[test]
	fn overlapping_batches_keep_the_earlier_item() {
		let mut evidence = Vec::new();
		let added = merge_results(&mut evidence, vec![
			vec![item("shared passage", "FromFirstQuery", 0.9)],
			vec![item("shared passage", "FromSecondQuery", 0.99), item("unique", "Other", 0.5)],
		]);

		assert_eq!(added, 2);
		assert_eq!(evidence.len(), 2);
		assert_eq!(evidence[0].metadata.api_name, "FromFirstQuery");
	}

	#[test]
	fn refinement_passes_deduplicate_against_prior_evidence() {
		let mut evidence = vec![item("already retrieved", "First", 0.8)];
		let added = merge_results(&mut evidence, vec![vec![
			item("already retrieved", "Again", 0.95),
			item("fresh passage", "Second", 0.7),
		]]);

		assert_eq!(added, 1);
		assert_eq!(evidence.len(), 2);
		assert_eq!(evidence[1].metadata.api_name, "Second");
	}

	#[test]
	fn duplicates_within_a_batch_collapse() {
		let mut evidence = Vec::new();
		let added = merge_results(&mut evidence, vec![vec![
			item("same", "A", 0.9),
			item("same", "A", 0.9),
		]]);

		assert_eq!(added, 1);
	}

	#[test]
	fn long_texts_collide_on_their_prefix() {
		let prefix = "x".repeat(100);
		let mut evidence = Vec::new();
		let added = merge_results(&mut evidence, vec![vec![
			item(&format!("{prefix} tail one"), "A", 0.9),
			item(&format!("{prefix} tail two"), "B", 0.8),
		]]);

		assert_eq!(added, 1);
		assert_eq!(evidence[0].metadata.api_name, "A");
	}
}

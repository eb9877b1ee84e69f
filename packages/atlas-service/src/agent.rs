mod classify;
mod decompose;
mod generate;
mod refine;
mod retrieve;
mod verify;

pub mod state;

pub(crate) use self::generate::build_generate_messages;

use std::time::Instant;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use atlas_domain::{evidence::ItemKind, grounding::GroundingReport, query::QueryType};
use atlas_storage::{models::AgentRun, runs};

use crate::{AtlasService, ServiceError, ServiceResult};
use self::state::{PipelineState, Stage, TraceEntry};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRequest {
	pub query: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
	pub api_name: String,
	pub score: f32,
	pub kind: ItemKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerResponse {
	pub query: String,
	pub query_type: QueryType,
	pub answer: String,
	pub grounding: GroundingReport,
	pub trace: Vec<TraceEntry>,
	pub retries: u32,
	pub sources: Vec<SourceSummary>,
	pub latency_ms: u64,
}

impl AtlasService {
	/// Runs the full agentic pipeline: classify, decompose, retrieve,
	/// generate, verify, and refine-and-retry while the grounding score
	/// stays under `agent.grounding_threshold` and retries remain.
	///
	/// The caller always gets the best-effort answer with its grounding
	/// report and trace; a low final score is labelled, never hidden.
	pub async fn answer(&self, req: AnswerRequest) -> ServiceResult<AnswerResponse> {
		let query = req.query.trim().to_string();

		if query.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "query must be non-empty.".to_string(),
			});
		}

		let started = Instant::now();
		let mut state = PipelineState::new(query);
		let mut stage = Stage::Classify;

		while stage != Stage::Done {
			match stage {
				Stage::Classify => self.classify(&mut state).await?,
				Stage::Decompose => self.decompose(&mut state).await?,
				Stage::Retrieve => self.retrieve(&mut state).await?,
				Stage::Generate => self.generate(&mut state).await?,
				Stage::Verify => self.verify(&mut state).await?,
				Stage::Refine => self.refine(&mut state).await?,
				Stage::Done => {},
			}

			stage = stage.next(&state.guards(&self.cfg.agent));
		}

		let latency_ms = started.elapsed().as_millis() as u64;

		self.record_run(&state, latency_ms);

		Ok(build_response(state, latency_ms, self.cfg.agent.max_context_items))
	}

	/// Fire-and-forget observability write; a failed insert is a warning,
	/// never a run failure.
	fn record_run(&self, state: &PipelineState, latency_ms: u64) {
		let trace = match serde_json::to_value(&state.trace) {
			Ok(value) => value,
			Err(err) => {
				tracing::warn!(error = %err, "Trace serialization failed.");

				return;
			},
		};
		let run = AgentRun {
			run_id: Uuid::new_v4(),
			ts: OffsetDateTime::now_utc(),
			query: state.query.clone(),
			query_type: state.query_type.unwrap_or_default().as_str().to_string(),
			latency_ms: latency_ms as i64,
			grounding_score: state.grounding.score,
			retry_count: state.retry_count as i32,
			generate_tokens: generate_tokens(&state.trace) as i64,
			trace,
		};
		let pool = self.db.pool.clone();

		tokio::spawn(async move {
			if let Err(err) = runs::insert_run(&pool, &run).await {
				tracing::warn!(error = %err, "Run record write failed.");
			}
		});
	}
}

fn build_response(
	state: PipelineState,
	latency_ms: u64,
	max_context_items: u32,
) -> AnswerResponse {
	let sources = state
		.context_evidence(max_context_items)
		.iter()
		.map(|item| SourceSummary {
			api_name: item.metadata.api_name.clone(),
			score: item.relevance_score,
			kind: item.metadata.kind,
		})
		.collect();

	AnswerResponse {
		query: state.query,
		query_type: state.query_type.unwrap_or_default(),
		answer: state.answer,
		grounding: state.grounding,
		trace: state.trace,
		retries: state.retry_count,
		sources,
		latency_ms,
	}
}

fn generate_tokens(trace: &[TraceEntry]) -> u64 {
	trace
		.iter()
		.map(|entry| match entry {
			TraceEntry::Generate { tokens, .. } => *tokens as u64,
			_ => 0,
		})
		.sum()
}

/// Models often wrap JSON in markdown fences; strip them before decoding.
pub(crate) fn strip_code_fences(raw: &str) -> String {
	raw.replace("```json", "").replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strips_fenced_json() {
		assert_eq!(strip_code_fences("```json\n{\"type\": \"SIMPLE\"}\n```"), "{\"type\": \"SIMPLE\"}");
		assert_eq!(strip_code_fences("  plain  "), "plain");
	}

	#[test]
	fn sums_generation_tokens_across_retries() {
		let trace = vec![
			TraceEntry::Generate { tokens: 120, model: "m".to_string(), elapsed_ms: 5 },
			TraceEntry::Retrieve { sub_queries: 1, new_results: 0, total_results: 3, elapsed_ms: 1 },
			TraceEntry::Generate { tokens: 80, model: "m".to_string(), elapsed_ms: 4 },
		];

		assert_eq!(generate_tokens(&trace), 200);
	}
}

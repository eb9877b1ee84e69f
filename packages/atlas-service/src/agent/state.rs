use serde::{Deserialize, Serialize};

use atlas_domain::{evidence::EvidenceItem, grounding::GroundingReport, query::QueryType};

/// Pipeline stages. `Verify` either loops back through `Refine` or reaches
/// `Done`; every other transition is unconditional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	Classify,
	Decompose,
	Retrieve,
	Generate,
	Verify,
	Refine,
	Done,
}

/// Everything the transition function is allowed to look at.
#[derive(Debug, Clone, Copy)]
pub struct Guards {
	pub grounding_score: f32,
	pub retry_count: u32,
	pub grounding_threshold: f32,
	pub max_retries: u32,
}

impl Stage {
	/// Pure transition function; given equal guards the successor is always
	/// the same, so a run is replayable from its trace.
	pub fn next(self, guards: &Guards) -> Self {
		match self {
			Self::Classify => Self::Decompose,
			Self::Decompose => Self::Retrieve,
			Self::Retrieve => Self::Generate,
			Self::Generate => Self::Verify,
			Self::Verify =>
				if guards.grounding_score < guards.grounding_threshold
					&& guards.retry_count < guards.max_retries
				{
					Self::Refine
				} else {
					Self::Done
				},
			Self::Refine => Self::Retrieve,
			Self::Done => Self::Done,
		}
	}
}

/// Append-only audit record of one stage execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum TraceEntry {
	Classify {
		result: QueryType,
		model: String,
		elapsed_ms: u64,
	},
	/// `model` is `None` when the SIMPLE short-circuit skipped the call.
	Decompose {
		sub_queries: Vec<String>,
		model: Option<String>,
		elapsed_ms: u64,
	},
	Retrieve {
		sub_queries: u32,
		new_results: u32,
		total_results: u32,
		elapsed_ms: u64,
	},
	Generate {
		tokens: u32,
		model: String,
		elapsed_ms: u64,
	},
	Verify {
		grounding_score: f32,
		supported: u32,
		total: u32,
		model: String,
		elapsed_ms: u64,
	},
	Refine {
		reason: String,
		refined_queries: Vec<String>,
		retry: u32,
		model: String,
		elapsed_ms: u64,
	},
}

/// Mutable state threaded through one pipeline run. Created fresh per query,
/// never shared across runs.
#[derive(Debug, Serialize)]
pub struct PipelineState {
	pub query: String,
	pub query_type: Option<QueryType>,
	pub sub_queries: Vec<String>,
	pub evidence: Vec<EvidenceItem>,
	pub answer: String,
	pub grounding: GroundingReport,
	pub trace: Vec<TraceEntry>,
	pub retry_count: u32,
}
impl PipelineState {
	pub fn new(query: String) -> Self {
		Self {
			query,
			query_type: None,
			sub_queries: Vec::new(),
			evidence: Vec::new(),
			answer: String::new(),
			grounding: GroundingReport::empty(),
			trace: Vec::new(),
			retry_count: 0,
		}
	}

	pub fn guards(&self, agent: &atlas_config::Agent) -> Guards {
		Guards {
			grounding_score: self.grounding.score,
			retry_count: self.retry_count,
			grounding_threshold: agent.grounding_threshold,
			max_retries: agent.max_retries,
		}
	}

	/// The evidence slice handed to generation and verification: the first
	/// `max_items` in arrival order, never re-sorted by score.
	pub fn context_evidence(&self, max_items: u32) -> &[EvidenceItem] {
		let end = (max_items as usize).min(self.evidence.len());

		&self.evidence[..end]
	}
}

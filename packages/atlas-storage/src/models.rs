use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// One completed pipeline run, as persisted for observability.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AgentRun {
	pub run_id: Uuid,
	#[serde(with = "crate::time_serde")]
	pub ts: OffsetDateTime,
	pub query: String,
	pub query_type: String,
	pub latency_ms: i64,
	pub grounding_score: f32,
	pub retry_count: i32,
	pub generate_tokens: i64,
	pub trace: Value,
}

use serde::Serialize;
use sqlx::PgPool;

use crate::{Result, models::AgentRun};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RunSummary {
	pub total_runs: i64,
	pub avg_latency_ms: f64,
	pub p95_latency_ms: f64,
	pub avg_grounding: f64,
	pub total_tokens: i64,
}

pub async fn insert_run(pool: &PgPool, run: &AgentRun) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO agent_runs (
	run_id,
	ts,
	query,
	query_type,
	latency_ms,
	grounding_score,
	retry_count,
	generate_tokens,
	trace
)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)",
	)
	.bind(run.run_id)
	.bind(run.ts)
	.bind(&run.query)
	.bind(&run.query_type)
	.bind(run.latency_ms)
	.bind(run.grounding_score)
	.bind(run.retry_count)
	.bind(run.generate_tokens)
	.bind(&run.trace)
	.execute(pool)
	.await?;

	Ok(())
}

pub async fn summary(pool: &PgPool) -> Result<RunSummary> {
	let summary = sqlx::query_as::<_, RunSummary>(
		"\
SELECT
	COUNT(*) AS total_runs,
	COALESCE(AVG(latency_ms), 0)::float8 AS avg_latency_ms,
	COALESCE(percentile_cont(0.95) WITHIN GROUP (ORDER BY latency_ms), 0)::float8
		AS p95_latency_ms,
	COALESCE(AVG(grounding_score), 0)::float8 AS avg_grounding,
	COALESCE(SUM(generate_tokens), 0)::int8 AS total_tokens
FROM agent_runs",
	)
	.fetch_one(pool)
	.await?;

	Ok(summary)
}

pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<AgentRun>> {
	let runs = sqlx::query_as::<_, AgentRun>(
		"\
SELECT
	run_id,
	ts,
	query,
	query_type,
	latency_ms,
	grounding_score,
	retry_count,
	generate_tokens,
	trace
FROM agent_runs
ORDER BY ts DESC
LIMIT $1",
	)
	.bind(limit)
	.fetch_all(pool)
	.await?;

	Ok(runs)
}

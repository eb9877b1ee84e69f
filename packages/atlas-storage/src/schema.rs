pub fn render_schema() -> &'static str {
	"\
CREATE TABLE IF NOT EXISTS agent_runs (
	run_id UUID PRIMARY KEY,
	ts TIMESTAMPTZ NOT NULL,
	query TEXT NOT NULL,
	query_type TEXT NOT NULL,
	latency_ms BIGINT NOT NULL,
	grounding_score REAL NOT NULL,
	retry_count INTEGER NOT NULL,
	generate_tokens BIGINT NOT NULL,
	trace JSONB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_agent_runs_ts ON agent_runs (ts DESC)"
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn schema_creates_the_run_table() {
		let sql = render_schema();

		assert!(sql.contains("CREATE TABLE IF NOT EXISTS agent_runs"));
		assert!(sql.contains("grounding_score REAL NOT NULL"));
	}
}

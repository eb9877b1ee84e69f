use time::OffsetDateTime;
use uuid::Uuid;

use atlas_storage::{db::Db, models::AgentRun, runs};

fn run(query: &str, latency_ms: i64, grounding_score: f32, ts: OffsetDateTime) -> AgentRun {
	AgentRun {
		run_id: Uuid::new_v4(),
		ts,
		query: query.to_string(),
		query_type: "SIMPLE".to_string(),
		latency_ms,
		grounding_score,
		retry_count: 0,
		generate_tokens: 40,
		trace: serde_json::json!([{ "step": "classify", "result": "SIMPLE" }]),
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ATLAS_PG_DSN to run."]
async fn run_store_round_trip() {
	let Some(base_dsn) = atlas_testkit::env_dsn() else {
		eprintln!("Skipping run store tests; set ATLAS_PG_DSN to run this test.");

		return;
	};
	let test_db = atlas_testkit::TestDatabase::new(&base_dsn)
		.await
		.expect("Failed to create test database.");
	let cfg = atlas_config::Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect.");

	db.ensure_schema().await.expect("Failed to ensure schema.");
	// Idempotent: running the DDL twice must not fail.
	db.ensure_schema().await.expect("Failed to re-run schema.");

	let now = OffsetDateTime::now_utc();

	runs::insert_run(&db.pool, &run("first", 100, 0.5, now - time::Duration::minutes(2)))
		.await
		.expect("Failed to insert run.");
	runs::insert_run(&db.pool, &run("second", 300, 1.0, now))
		.await
		.expect("Failed to insert run.");

	let summary = runs::summary(&db.pool).await.expect("Failed to read summary.");

	assert_eq!(summary.total_runs, 2);
	assert!((summary.avg_latency_ms - 200.0).abs() < 0.01);
	assert!((summary.avg_grounding - 0.75).abs() < 0.01);
	assert_eq!(summary.total_tokens, 80);

	let recent = runs::recent(&db.pool, 10).await.expect("Failed to read recent runs.");

	assert_eq!(recent.len(), 2);
	assert_eq!(recent[0].query, "second");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ATLAS_PG_DSN to run."]
async fn summary_of_an_empty_table_is_zeroed() {
	let Some(base_dsn) = atlas_testkit::env_dsn() else {
		eprintln!("Skipping run store tests; set ATLAS_PG_DSN to run this test.");

		return;
	};
	let test_db = atlas_testkit::TestDatabase::new(&base_dsn)
		.await
		.expect("Failed to create test database.");
	let cfg = atlas_config::Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 1 };
	let db = Db::connect(&cfg).await.expect("Failed to connect.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	let summary = runs::summary(&db.pool).await.expect("Failed to read summary.");

	assert_eq!(summary.total_runs, 0);
	assert_eq!(summary.avg_latency_ms, 0.0);
	assert_eq!(summary.total_tokens, 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

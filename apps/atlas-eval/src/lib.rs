use std::{fs, path::PathBuf, time::Instant};

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use atlas_service::{AtlasService, SearchRequest};
use atlas_storage::{db::Db, qdrant::QdrantStore};

#[derive(Debug, Parser)]
#[command(
	version = atlas_cli::VERSION,
	rename_all = "kebab",
	styles = atlas_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Golden dataset: a JSON array of { query, expected_api }.
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: PathBuf,
	/// Where to write the per-query results JSON.
	#[arg(long, short = 'o', value_name = "FILE")]
	pub output: Option<PathBuf>,
	#[arg(long, default_value_t = 5)]
	pub top_k: u32,
}

#[derive(Debug, Deserialize)]
pub struct EvalCase {
	pub query: String,
	pub expected_api: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CaseResult {
	pub query: String,
	pub expected_api: Option<String>,
	pub top_results: Vec<String>,
	pub hit_at_3: bool,
	pub precision_at_5: Option<f64>,
	pub precision_at_3: Option<f64>,
	pub latency_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct EvalReport {
	pub total_queries: usize,
	pub avg_precision_at_5: f64,
	pub avg_precision_at_3: f64,
	pub hit_rate_at_3: f64,
	pub avg_latency_ms: u64,
	pub results: Vec<CaseResult>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = atlas_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).init();

	let raw = fs::read_to_string(&args.dataset)?;
	let cases: Vec<EvalCase> = serde_json::from_str(&raw)?;

	let db = Db::connect(&config.storage.postgres).await?;
	db.ensure_schema().await?;
	let qdrant = QdrantStore::new(&config.storage.qdrant)?;
	let service = AtlasService::new(config, db, qdrant);

	tracing::info!(cases = cases.len(), "Running retrieval evaluation.");

	let report = evaluate(&service, &cases, args.top_k).await?;

	tracing::info!(
		total_queries = report.total_queries,
		avg_precision_at_5 = report.avg_precision_at_5,
		avg_precision_at_3 = report.avg_precision_at_3,
		hit_rate_at_3 = report.hit_rate_at_3,
		avg_latency_ms = report.avg_latency_ms,
		"Evaluation complete."
	);

	if let Some(output) = &args.output {
		fs::write(output, serde_json::to_string_pretty(&report)?)?;
		tracing::info!(path = %output.display(), "Results written.");
	} else {
		println!("{}", serde_json::to_string_pretty(&report)?);
	}

	Ok(())
}

async fn evaluate(
	service: &AtlasService,
	cases: &[EvalCase],
	top_k: u32,
) -> color_eyre::Result<EvalReport> {
	let mut results = Vec::with_capacity(cases.len());
	let mut total_p5 = 0.0;
	let mut total_p3 = 0.0;
	let mut scored = 0usize;
	let mut hits = 0usize;
	let mut total_latency_ms = 0u64;

	for case in cases {
		let started = Instant::now();
		let response = service
			.search(SearchRequest { query: case.query.clone(), top_k: Some(top_k) })
			.await?;
		let latency_ms = started.elapsed().as_millis() as u64;
		let api_names: Vec<String> =
			response.results.iter().map(|item| item.metadata.api_name.clone()).collect();
		let p5 = precision_at_k(&api_names, case.expected_api.as_deref(), 5);
		let p3 = precision_at_k(&api_names, case.expected_api.as_deref(), 3);
		let hit_at_3 = case
			.expected_api
			.as_deref()
			.map(|expected| {
				api_names
					.iter()
					.take(3)
					.any(|name| name.to_lowercase().contains(&expected.to_lowercase()))
			})
			.unwrap_or(false);

		if let (Some(p5), Some(p3)) = (p5, p3) {
			total_p5 += p5;
			total_p3 += p3;
			scored += 1;
		}
		if hit_at_3 {
			hits += 1;
		}

		total_latency_ms += latency_ms;

		tracing::info!(
			query = %case.query,
			hit_at_3,
			precision_at_5 = ?p5,
			latency_ms,
			"Case evaluated."
		);
		results.push(CaseResult {
			query: case.query.clone(),
			expected_api: case.expected_api.clone(),
			top_results: api_names.into_iter().take(3).collect(),
			hit_at_3,
			precision_at_5: p5,
			precision_at_3: p3,
			latency_ms,
		});
	}

	let total = cases.len().max(1);

	Ok(EvalReport {
		total_queries: cases.len(),
		avg_precision_at_5: if scored == 0 { 0.0 } else { total_p5 / scored as f64 },
		avg_precision_at_3: if scored == 0 { 0.0 } else { total_p3 / scored as f64 },
		hit_rate_at_3: hits as f64 / total as f64,
		avg_latency_ms: total_latency_ms / total as u64,
		results,
	})
}

/// Share of the top-k results whose API name matches the expectation.
/// `None` when the case has no expected API to score against.
fn precision_at_k(api_names: &[String], expected_api: Option<&str>, k: usize) -> Option<f64> {
	let expected = expected_api?.to_lowercase();
	let relevant =
		api_names.iter().take(k).filter(|name| name.to_lowercase().contains(&expected)).count();

	Some(relevant as f64 / k as f64)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn names(list: &[&str]) -> Vec<String> {
		list.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn precision_counts_case_insensitive_matches() {
		let api_names = names(&["Twilio SMS", "Authentiq", "twilio voice", "Adyen", "Okta"]);
		let p5 = precision_at_k(&api_names, Some("twilio"), 5);

		assert_eq!(p5, Some(0.4));
	}

	#[test]
	fn unscored_cases_return_none() {
		let api_names = names(&["Twilio"]);

		assert_eq!(precision_at_k(&api_names, None, 5), None);
	}

	#[test]
	fn precision_is_relative_to_k_not_result_count() {
		let api_names = names(&["Twilio"]);
		let p5 = precision_at_k(&api_names, Some("twilio"), 5);

		assert_eq!(p5, Some(0.2));
	}
}

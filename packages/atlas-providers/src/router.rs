use std::{
	collections::HashMap,
	sync::Mutex,
	time::{Duration, Instant},
};

use color_eyre::{Result, eyre};
use serde::Serialize;
use serde_json::Value;

use atlas_config::LlmProviderConfig;

use crate::completion::{self, Completion};

/// Priority-ordered completion routing: the requested provider first, then
/// each configured fallback until one succeeds. Per-route counters feed the
/// metrics endpoint.
pub struct CompletionRouter {
	fallbacks: Vec<LlmProviderConfig>,
	counters: Mutex<HashMap<String, RouteCounters>>,
}

#[derive(Debug, Default)]
struct RouteCounters {
	requests: u64,
	failures: u64,
	total_latency: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
	pub route: String,
	pub requests: u64,
	pub failures: u64,
	pub avg_latency_ms: u64,
	pub traffic_pct: f32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RouterSnapshot {
	pub total_requests: u64,
	pub routes: Vec<RouteSummary>,
}

impl CompletionRouter {
	pub fn new(fallbacks: Vec<LlmProviderConfig>) -> Self {
		Self { fallbacks, counters: Mutex::new(HashMap::new()) }
	}

	pub async fn complete(
		&self,
		primary: &LlmProviderConfig,
		messages: &[Value],
		max_tokens: Option<u32>,
	) -> Result<Completion> {
		let mut errors = Vec::new();

		for cfg in std::iter::once(primary).chain(self.fallbacks.iter()) {
			let started = Instant::now();

			match completion::complete(cfg, messages, max_tokens).await {
				Ok(done) => {
					self.record(&route_key(cfg), started.elapsed(), true);

					return Ok(done);
				},
				Err(err) => {
					self.record(&route_key(cfg), started.elapsed(), false);
					errors.push(format!("{}: {err}", cfg.provider_id));
				},
			}
		}

		Err(eyre::eyre!("All completion providers failed: {}.", errors.join("; ")))
	}

	pub fn snapshot(&self) -> RouterSnapshot {
		let counters = self.counters.lock().unwrap_or_else(|err| err.into_inner());
		let total_requests: u64 = counters.values().map(|c| c.requests).sum();
		let mut routes: Vec<RouteSummary> = counters
			.iter()
			.map(|(route, c)| RouteSummary {
				route: route.clone(),
				requests: c.requests,
				failures: c.failures,
				avg_latency_ms: if c.requests == 0 {
					0
				} else {
					(c.total_latency.as_millis() / c.requests as u128) as u64
				},
				traffic_pct: if total_requests == 0 {
					0.0
				} else {
					c.requests as f32 / total_requests as f32 * 100.0
				},
			})
			.collect();

		routes.sort_by(|a, b| a.route.cmp(&b.route));

		RouterSnapshot { total_requests, routes }
	}

	fn record(&self, route: &str, elapsed: Duration, ok: bool) {
		let mut counters = self.counters.lock().unwrap_or_else(|err| err.into_inner());
		let entry = counters.entry(route.to_string()).or_default();

		entry.requests += 1;
		entry.total_latency += elapsed;

		if !ok {
			entry.failures += 1;
		}
	}
}

fn route_key(cfg: &LlmProviderConfig) -> String {
	format!("{}:{}", cfg.provider_id, cfg.model)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn snapshot_reports_traffic_share_and_failures() {
		let router = CompletionRouter::new(Vec::new());

		router.record("openai:gpt", Duration::from_millis(100), true);
		router.record("openai:gpt", Duration::from_millis(300), true);
		router.record("openai:gpt", Duration::from_millis(200), false);
		router.record("azure:gpt", Duration::from_millis(50), true);

		let snapshot = router.snapshot();

		assert_eq!(snapshot.total_requests, 4);
		assert_eq!(snapshot.routes.len(), 2);

		let azure = &snapshot.routes[0];
		let openai = &snapshot.routes[1];

		assert_eq!(azure.route, "azure:gpt");
		assert_eq!(azure.requests, 1);
		assert_eq!(openai.requests, 3);
		assert_eq!(openai.failures, 1);
		assert_eq!(openai.avg_latency_ms, 200);
		assert!((openai.traffic_pct - 75.0).abs() < 0.01);
	}

	#[test]
	fn empty_router_snapshot_is_empty() {
		let router = CompletionRouter::new(Vec::new());
		let snapshot = router.snapshot();

		assert_eq!(snapshot.total_requests, 0);
		assert!(snapshot.routes.is_empty());
	}
}

use serde::Serialize;

use atlas_providers::RouterSnapshot;
use atlas_storage::{
	models::AgentRun,
	runs::{self, RunSummary},
};

use crate::{AtlasService, ServiceResult};

const RECENT_RUN_LIMIT: i64 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
	pub summary: RunSummary,
	pub recent_runs: Vec<AgentRun>,
	/// Absent when custom providers were injected and no default completion
	/// router exists.
	pub routing: Option<RouterSnapshot>,
}

impl AtlasService {
	pub async fn metrics(&self) -> ServiceResult<MetricsResponse> {
		let summary = runs::summary(&self.db.pool).await?;
		let recent_runs = runs::recent(&self.db.pool, RECENT_RUN_LIMIT).await?;

		Ok(MetricsResponse { summary, recent_runs, routing: self.router_snapshot() })
	}
}

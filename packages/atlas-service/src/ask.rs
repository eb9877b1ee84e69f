use serde::{Deserialize, Serialize};

use atlas_domain::{
	evidence::{ItemKind, truncate_chars},
	query::QueryType,
};

use crate::{AtlasService, ServiceError, ServiceResult, agent};

const SOURCE_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
	pub query: String,
	pub top_k: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskSource {
	pub api_name: String,
	pub score: f32,
	pub kind: ItemKind,
	pub text: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TokenUsage {
	pub input: u32,
	pub output: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
	pub query: String,
	pub answer: String,
	pub sources: Vec<AskSource>,
	pub tokens: TokenUsage,
}

impl AtlasService {
	/// Single-pass RAG: one retrieval, one cited generation, no
	/// classification or refinement loop.
	pub async fn ask(&self, req: AskRequest) -> ServiceResult<AskResponse> {
		let query = req.query.trim().to_string();

		if query.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "query must be non-empty.".to_string(),
			});
		}

		let top_k = req.top_k.unwrap_or(self.cfg.search.top_k).max(1);
		let results = self.providers.search.search(&query, top_k).await?;
		let messages = agent::build_generate_messages(&query, QueryType::Simple, &results);
		let completion =
			self.providers.completion.complete(&self.cfg.providers.completion, &messages, None).await?;
		let sources = results
			.iter()
			.map(|item| AskSource {
				api_name: item.metadata.api_name.clone(),
				score: item.relevance_score,
				kind: item.metadata.kind,
				text: truncate_chars(&item.text, SOURCE_PREVIEW_CHARS),
			})
			.collect();

		Ok(AskResponse {
			query,
			answer: completion.text,
			sources,
			tokens: TokenUsage {
				input: completion.prompt_tokens,
				output: completion.completion_tokens,
			},
		})
	}
}

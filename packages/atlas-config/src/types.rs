use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub agent: Agent,
	pub search: Search,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	/// Primary chat model; drives generation, verification, and refinement.
	pub completion: LlmProviderConfig,
	/// Cheap model for classification and decomposition.
	pub completion_fast: LlmProviderConfig,
	/// Tried in order when the primary completion call fails.
	#[serde(default)]
	pub completion_fallbacks: Vec<LlmProviderConfig>,
	pub grounding: LlmProviderConfig,
	pub rerank: ProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

/// Tuning knobs for the agentic answer pipeline. `grounding_threshold = 0.0`
/// with `max_retries = 0` disables the refinement loop entirely.
#[derive(Debug, Deserialize)]
pub struct Agent {
	pub grounding_threshold: f32,
	pub max_retries: u32,
	#[serde(default = "default_top_k_per_query")]
	pub top_k_per_query: u32,
	#[serde(default = "default_max_context_items")]
	pub max_context_items: u32,
	#[serde(default = "default_max_sub_queries")]
	pub max_sub_queries: u32,
	#[serde(default = "default_evidence_snippet_chars")]
	pub evidence_snippet_chars: u32,
	#[serde(default = "default_max_answer_tokens")]
	pub max_answer_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct Search {
	pub top_k: u32,
	#[serde(default)]
	pub rerank_enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	pub api_auth_token: Option<String>,
}

fn default_top_k_per_query() -> u32 {
	5
}

fn default_max_context_items() -> u32 {
	10
}

fn default_max_sub_queries() -> u32 {
	4
}

fn default_evidence_snippet_chars() -> u32 {
	200
}

fn default_max_answer_tokens() -> u32 {
	400
}

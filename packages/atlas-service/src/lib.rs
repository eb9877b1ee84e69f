pub mod agent;
pub mod ask;
pub mod metrics;
pub mod search;
pub mod semantic;

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

pub use agent::{
	AnswerRequest, AnswerResponse, SourceSummary,
	state::{Guards, PipelineState, Stage, TraceEntry},
};
pub use ask::{AskRequest, AskResponse, AskSource, TokenUsage};
pub use metrics::MetricsResponse;
pub use search::{SearchRequest, SearchResponse};
pub use semantic::SemanticSearch;

use atlas_config::{Config, LlmProviderConfig, ProviderConfig};
use atlas_domain::{evidence::EvidenceItem, grounding::GroundingSource};
use atlas_providers::{Completion, CompletionRouter, RouterSnapshot, grounding, rerank};
use atlas_storage::{db::Db, qdrant::QdrantStore};

pub type ServiceResult<T> = Result<T, ServiceError>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Semantic lookup over the API spec corpus. Must be deterministic for an
/// unchanged index.
pub trait SearchProvider
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		query: &'a str,
		top_k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<EvidenceItem>>>;
}

pub trait CompletionProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
		max_tokens: Option<u32>,
	) -> BoxFuture<'a, color_eyre::Result<Completion>>;
}

/// Audits an answer against its evidence slice. Returns the raw model text;
/// the verify stage owns the decode and its fail-safe default.
pub trait GroundingProvider
where
	Self: Send + Sync,
{
	fn check<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		answer: &'a str,
		sources: &'a [GroundingSource],
	) -> BoxFuture<'a, color_eyre::Result<Completion>>;
}

pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub search: Arc<dyn SearchProvider>,
	pub completion: Arc<dyn CompletionProvider>,
	pub grounding: Arc<dyn GroundingProvider>,
	pub rerank: Arc<dyn RerankProvider>,
}
impl Providers {
	pub fn new(
		search: Arc<dyn SearchProvider>,
		completion: Arc<dyn CompletionProvider>,
		grounding: Arc<dyn GroundingProvider>,
		rerank: Arc<dyn RerankProvider>,
	) -> Self {
		Self { search, completion, grounding, rerank }
	}
}

pub struct AtlasService {
	pub cfg: Config,
	pub db: Db,
	pub providers: Providers,
	router: Option<Arc<CompletionRouter>>,
}
impl AtlasService {
	pub fn new(cfg: Config, db: Db, qdrant: QdrantStore) -> Self {
		let router = Arc::new(CompletionRouter::new(cfg.providers.completion_fallbacks.clone()));
		let providers = Providers {
			search: Arc::new(SemanticSearch::new(cfg.providers.embedding.clone(), qdrant)),
			completion: Arc::new(RoutedCompletion { router: router.clone() }),
			grounding: Arc::new(DefaultGrounding),
			rerank: Arc::new(DefaultRerank),
		};

		Self { cfg, db, providers, router: Some(router) }
	}

	/// Injects custom providers; no default completion router is wired, so
	/// the metrics response carries no routing snapshot.
	pub fn with_providers(cfg: Config, db: Db, providers: Providers) -> Self {
		Self { cfg, db, providers, router: None }
	}

	pub(crate) fn router_snapshot(&self) -> Option<RouterSnapshot> {
		self.router.as_ref().map(|router| router.snapshot())
	}
}

#[derive(Debug)]
pub enum ServiceError {
	InvalidRequest { message: String },
	Provider { message: String },
	Storage { message: String },
}

impl std::fmt::Display for ServiceError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::InvalidRequest { message } => write!(f, "Invalid request: {message}"),
			Self::Provider { message } => write!(f, "Provider error: {message}"),
			Self::Storage { message } => write!(f, "Storage error: {message}"),
		}
	}
}

impl std::error::Error for ServiceError {}

impl From<sqlx::Error> for ServiceError {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<atlas_storage::Error> for ServiceError {
	fn from(err: atlas_storage::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<color_eyre::Report> for ServiceError {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

struct RoutedCompletion {
	router: Arc<CompletionRouter>,
}
impl CompletionProvider for RoutedCompletion {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
		max_tokens: Option<u32>,
	) -> BoxFuture<'a, color_eyre::Result<Completion>> {
		Box::pin(self.router.complete(cfg, messages, max_tokens))
	}
}

struct DefaultGrounding;
impl GroundingProvider for DefaultGrounding {
	fn check<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		answer: &'a str,
		sources: &'a [GroundingSource],
	) -> BoxFuture<'a, color_eyre::Result<Completion>> {
		Box::pin(grounding::check(cfg, answer, sources))
	}
}

struct DefaultRerank;
impl RerankProvider for DefaultRerank {
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(rerank::rerank(cfg, query, docs))
	}
}

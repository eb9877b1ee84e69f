mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Agent, Config, EmbeddingProviderConfig, LlmProviderConfig, Postgres, ProviderConfig, Providers,
	Qdrant, Search, Security, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}

	if !cfg.agent.grounding_threshold.is_finite() {
		return Err(Error::Validation {
			message: "agent.grounding_threshold must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&cfg.agent.grounding_threshold) {
		return Err(Error::Validation {
			message: "agent.grounding_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.agent.top_k_per_query == 0 {
		return Err(Error::Validation {
			message: "agent.top_k_per_query must be greater than zero.".to_string(),
		});
	}
	if cfg.agent.max_context_items == 0 {
		return Err(Error::Validation {
			message: "agent.max_context_items must be greater than zero.".to_string(),
		});
	}
	if cfg.agent.max_sub_queries == 0 {
		return Err(Error::Validation {
			message: "agent.max_sub_queries must be greater than zero.".to_string(),
		});
	}
	if cfg.agent.evidence_snippet_chars == 0 {
		return Err(Error::Validation {
			message: "agent.evidence_snippet_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.agent.max_answer_tokens == 0 {
		return Err(Error::Validation {
			message: "agent.max_answer_tokens must be greater than zero.".to_string(),
		});
	}
	if cfg.search.top_k == 0 {
		return Err(Error::Validation {
			message: "search.top_k must be greater than zero.".to_string(),
		});
	}

	let mut keyed_providers = vec![
		("embedding", &cfg.providers.embedding.api_key),
		("completion", &cfg.providers.completion.api_key),
		("completion_fast", &cfg.providers.completion_fast.api_key),
		("grounding", &cfg.providers.grounding.api_key),
	];

	if cfg.search.rerank_enabled {
		keyed_providers.push(("rerank", &cfg.providers.rerank.api_key));
	}

	for fallback in &cfg.providers.completion_fallbacks {
		keyed_providers.push(("completion_fallbacks", &fallback.api_key));
	}

	for (label, key) in keyed_providers {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.security.api_auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.api_auth_token = None;
	}
}

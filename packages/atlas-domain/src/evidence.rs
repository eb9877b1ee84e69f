use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Two evidence items whose text shares this prefix are the same passage.
pub const DEDUP_KEY_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
	Overview,
	Endpoint,
}
impl ItemKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Overview => "overview",
			Self::Endpoint => "endpoint",
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceMetadata {
	pub api_name: String,
	pub kind: ItemKind,
	pub method: Option<String>,
	pub path: Option<String>,
	pub source_ref: Value,
}

/// One retrieved passage from the spec corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
	pub text: String,
	pub metadata: EvidenceMetadata,
	pub relevance_score: f32,
}
impl EvidenceItem {
	pub fn dedup_key(&self) -> String {
		dedup_key(&self.text)
	}
}

/// Identity fingerprint for an evidence item, shared across retrieval passes.
pub fn dedup_key(text: &str) -> String {
	truncate_chars(text, DEDUP_KEY_CHARS)
}

/// Truncates on a character boundary, never mid code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
	text.chars().take(max_chars).collect()
}

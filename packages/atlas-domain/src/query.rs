use serde::{Deserialize, Serialize};

/// Complexity bucket assigned to an incoming query by classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryType {
	#[default]
	Simple,
	Compare,
	Explore,
}
impl QueryType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Simple => "SIMPLE",
			Self::Compare => "COMPARE",
			Self::Explore => "EXPLORE",
		}
	}

	pub fn is_simple(self) -> bool {
		matches!(self, Self::Simple)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_screaming_snake_case() {
		let parsed: QueryType = serde_json::from_str("\"COMPARE\"").expect("parse failed");

		assert_eq!(parsed, QueryType::Compare);
		assert_eq!(serde_json::to_string(&parsed).expect("encode failed"), "\"COMPARE\"");
	}
}

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coarse access tier stamped on every indexed chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
	Private,
	Team,
	Channel,
	#[default]
	Public,
}
impl Visibility {
	pub const ALL: [Visibility; 4] =
		[Visibility::Private, Visibility::Team, Visibility::Channel, Visibility::Public];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Private => "private",
			Self::Team => "team",
			Self::Channel => "channel",
			Self::Public => "public",
		}
	}
}
impl fmt::Display for Visibility {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for Visibility {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"private" => Ok(Self::Private),
			"team" => Ok(Self::Team),
			"channel" => Ok(Self::Channel),
			"public" => Ok(Self::Public),
			other => Err(format!("Unknown visibility {other:?}.")),
		}
	}
}

/// Payload carried by a single indexed chunk.
///
/// The access fields are written at ingestion time and read back for every
/// per-item authorization check. Fields the system does not interpret live in
/// `extra`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ChunkPayload {
	#[serde(default)]
	pub text: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub doc_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub chunk_index: Option<i64>,
	#[serde(default)]
	pub doc_type: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub space_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub channel_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub owner_id: Option<String>,
	#[serde(default)]
	pub visibility: Visibility,
	#[serde(default)]
	pub access_list: Vec<String>,
	#[serde(default)]
	pub agent_roles: Vec<String>,
	#[serde(default)]
	pub security_level: u8,
	/// Empty means the chunk is global to the space.
	#[serde(default)]
	pub department: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub team_id: Option<String>,
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CandidateItem {
	pub key: String,
	/// Source-native score. Not comparable across sources.
	pub score: f32,
	pub payload: ChunkPayload,
}
impl CandidateItem {
	pub fn new(key: impl Into<String>, score: f32, payload: ChunkPayload) -> Self {
		Self { key: key.into(), score, payload }
	}

	pub fn doc_id(&self) -> Option<&str> {
		self.payload.doc_id.as_deref().filter(|id| !id.is_empty())
	}

	pub fn text(&self) -> &str {
		&self.payload.text
	}
}

pub fn chunk_key(doc_id: &str, chunk_index: i64) -> String {
	format!("{doc_id}:{chunk_index}")
}

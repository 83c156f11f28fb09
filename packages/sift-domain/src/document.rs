use serde::{Deserialize, Serialize};

use crate::{ChunkPayload, Visibility};

/// A chunk ready to be written to the stores.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedChunk {
	pub key: String,
	pub vector: Vec<f32>,
	pub payload: ChunkPayload,
}

/// Access fields to overwrite on every chunk of one document. Unset fields are left alone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccessUpdate {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub visibility: Option<Visibility>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access_list: Option<Vec<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub agent_roles: Option<Vec<String>>,
}
impl AccessUpdate {
	pub fn is_empty(&self) -> bool {
		self.visibility.is_none() && self.access_list.is_none() && self.agent_roles.is_none()
	}

	pub fn apply(&self, payload: &mut ChunkPayload) {
		if let Some(visibility) = self.visibility {
			payload.visibility = visibility;
		}
		if let Some(access_list) = &self.access_list {
			payload.access_list = access_list.clone();
		}
		if let Some(agent_roles) = &self.agent_roles {
			payload.agent_roles = agent_roles.clone();
		}
	}
}

/// One row of a caller's document listing.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct OwnedDocument {
	pub doc_id: String,
	pub doc_type: String,
	pub visibility: Visibility,
	pub chunk_count: usize,
}

/// Groups chunk payloads by document, keeping first-seen document order.
pub fn group_by_document(chunks: &[ChunkPayload]) -> Vec<OwnedDocument> {
	let mut documents: Vec<OwnedDocument> = Vec::new();

	for chunk in chunks {
		let Some(doc_id) = chunk.doc_id.as_deref().filter(|id| !id.is_empty()) else { continue };

		match documents.iter_mut().find(|doc| doc.doc_id == doc_id) {
			Some(doc) => doc.chunk_count += 1,
			None => documents.push(OwnedDocument {
				doc_id: doc_id.to_string(),
				doc_type: chunk.doc_type.clone(),
				visibility: chunk.visibility,
				chunk_count: 1,
			}),
		}
	}

	documents
}

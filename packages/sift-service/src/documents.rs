use serde::{Deserialize, Serialize};

use crate::{Error, Result, SiftService, require_space};
use sift_access::{AccessContext, Mutation, role::MAX_SECURITY_LEVEL};
use sift_domain::{
	AccessUpdate, ChunkPayload, IndexedChunk, OwnedDocument, Visibility, chunk_key, doc_type,
	document,
};

#[derive(Clone, Debug, Deserialize)]
pub struct IndexDocumentRequest {
	pub doc_id: String,
	/// Normalized through the doc type aliases. Unknown or missing means unstructured.
	#[serde(default)]
	pub doc_type: Option<String>,
	/// Pre-chunked text in document order.
	pub chunks: Vec<String>,
	#[serde(default)]
	pub visibility: Option<Visibility>,
	#[serde(default)]
	pub access_list: Vec<String>,
	/// Falls back to `access.default_agent_roles`.
	#[serde(default)]
	pub agent_roles: Option<Vec<String>>,
	#[serde(default)]
	pub security_level: u8,
	#[serde(default)]
	pub department: String,
	#[serde(default)]
	pub team_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IndexDocumentResponse {
	pub doc_id: String,
	pub space_id: String,
	pub doc_type: String,
	pub chunks_indexed: usize,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpdateAccessRequest {
	pub doc_id: String,
	#[serde(flatten)]
	pub update: AccessUpdate,
}

impl SiftService {
	/// Embeds and stores a document's chunks, owned by the caller.
	///
	/// Re-indexing an existing document replaces its chunks and needs edit rights on it.
	pub async fn index_document(
		&self,
		ctx: &AccessContext,
		req: IndexDocumentRequest,
	) -> Result<IndexDocumentResponse> {
		let session = self.access.session(ctx);

		session.authorize(Mutation::Create, None)?;

		let space_id = require_space(ctx)?;
		let doc_id = req.doc_id.trim();

		if doc_id.is_empty() {
			return Err(Error::InvalidRequest { message: "doc_id must be non-empty.".to_string() });
		}
		if req.security_level > MAX_SECURITY_LEVEL {
			return Err(Error::InvalidRequest {
				message: format!("security_level must be at most {MAX_SECURITY_LEVEL}."),
			});
		}

		let texts: Vec<String> = req
			.chunks
			.iter()
			.map(|chunk| chunk.trim())
			.filter(|chunk| !chunk.is_empty())
			.map(str::to_string)
			.collect();

		if texts.is_empty() {
			return Err(Error::InvalidRequest {
				message: "chunks must contain non-empty text.".to_string(),
			});
		}

		let existing = self.sources.documents.doc_chunks(space_id, doc_id).await?;

		if !existing.is_empty() {
			session.authorize(Mutation::Edit, owner_of(&existing))?;
		}

		let vectors = self.providers.embedding.embed(&self.cfg.providers.embedding, &texts).await?;

		if vectors.len() != texts.len() {
			return Err(Error::Provider {
				message: "Embedding provider returned a mismatched vector count.".to_string(),
			});
		}
		if vectors.iter().any(|vector| vector.len() != self.cfg.storage.qdrant.vector_dim as usize)
		{
			return Err(Error::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		let doc_type = req
			.doc_type
			.as_deref()
			.and_then(doc_type::normalize)
			.unwrap_or(doc_type::UNSTRUCTURED)
			.to_string();
		let agent_roles =
			req.agent_roles.clone().unwrap_or_else(|| self.cfg.access.default_agent_roles.clone());
		let chunks: Vec<IndexedChunk> = texts
			.into_iter()
			.zip(vectors)
			.enumerate()
			.map(|(idx, (text, vector))| {
				let chunk_index = idx as i64;

				IndexedChunk {
					key: chunk_key(doc_id, chunk_index),
					vector,
					payload: ChunkPayload {
						text,
						doc_id: Some(doc_id.to_string()),
						chunk_index: Some(chunk_index),
						doc_type: doc_type.clone(),
						space_id: Some(space_id.to_string()),
						channel_id: ctx.channel_id.clone(),
						owner_id: Some(ctx.principal_id().to_string()),
						visibility: req.visibility.unwrap_or(Visibility::Team),
						access_list: req.access_list.clone(),
						agent_roles: agent_roles.clone(),
						security_level: req.security_level,
						department: req.department.trim().to_string(),
						team_id: req.team_id.clone().filter(|team| !team.is_empty()),
						..Default::default()
					},
				}
			})
			.collect();

		if !existing.is_empty() {
			self.sources.documents.delete_doc(space_id, doc_id).await?;
		}

		self.sources.documents.upsert_chunks(&chunks).await?;
		self.sources.lexical.index(&chunks).await?;
		self.clear_caches();

		tracing::info!(
			space_id,
			doc_id,
			doc_type = %doc_type,
			chunks = chunks.len(),
			"Document indexed."
		);

		Ok(IndexDocumentResponse {
			doc_id: doc_id.to_string(),
			space_id: space_id.to_string(),
			doc_type,
			chunks_indexed: chunks.len(),
		})
	}

	/// Removes every chunk of a document. Returns how many chunks were removed.
	pub async fn delete_document(&self, ctx: &AccessContext, doc_id: &str) -> Result<usize> {
		let space_id = require_space(ctx)?;
		let chunks = self.existing_chunks(space_id, doc_id).await?;

		self.access.session(ctx).authorize(Mutation::Delete, owner_of(&chunks))?;
		self.sources.documents.delete_doc(space_id, doc_id).await?;
		self.clear_caches();

		tracing::info!(space_id, doc_id, chunks = chunks.len(), "Document deleted.");

		Ok(chunks.len())
	}

	/// Rewrites access fields on every chunk of a document. Returns how many chunks changed.
	pub async fn update_document_access(
		&self,
		ctx: &AccessContext,
		req: UpdateAccessRequest,
	) -> Result<usize> {
		if req.update.is_empty() {
			return Err(Error::InvalidRequest {
				message: "Access update must change at least one field.".to_string(),
			});
		}

		let space_id = require_space(ctx)?;
		let chunks = self.existing_chunks(space_id, &req.doc_id).await?;

		self.access.session(ctx).authorize(Mutation::ManageAccess, owner_of(&chunks))?;
		self.sources.documents.update_doc_access(space_id, &req.doc_id, &req.update).await?;
		self.clear_caches();

		tracing::info!(
			space_id,
			doc_id = %req.doc_id,
			chunks = chunks.len(),
			"Document access updated."
		);

		Ok(chunks.len())
	}

	/// The caller's own documents in the context space.
	pub async fn my_documents(&self, ctx: &AccessContext) -> Result<Vec<OwnedDocument>> {
		let space_id = require_space(ctx)?;
		let chunks = self.sources.documents.owned_chunks(space_id, ctx.principal_id()).await?;

		Ok(document::group_by_document(&chunks))
	}

	async fn existing_chunks(&self, space_id: &str, doc_id: &str) -> Result<Vec<ChunkPayload>> {
		let chunks = self.sources.documents.doc_chunks(space_id, doc_id).await?;

		if chunks.is_empty() {
			return Err(Error::NotFound { message: format!("Document {doc_id} does not exist.") });
		}

		Ok(chunks)
	}
}

fn owner_of(chunks: &[ChunkPayload]) -> Option<&str> {
	chunks.iter().find_map(|chunk| chunk.owner_id.as_deref())
}

pub const DENSE_VECTOR_NAME: &str = "dense";
pub const BM25_VECTOR_NAME: &str = "bm25";
pub const BM25_MODEL: &str = "qdrant/bm25";

/// Payload fields that back the access filter and document lookups.
pub const KEYWORD_INDEX_FIELDS: [&str; 10] = [
	"space_id",
	"channel_id",
	"doc_id",
	"doc_type",
	"owner_id",
	"visibility",
	"access_list",
	"agent_roles",
	"department",
	"team_id",
];

const SCROLL_PAGE_SIZE: u32 = 256;

use std::collections::HashMap;

use qdrant_client::{
	client::Payload,
	qdrant::{
		CreateCollectionBuilder, CreateFieldIndexCollection, DeletePointsBuilder, Distance,
		Document, FieldType, Filter, Modifier, PointId, PointStruct, Query, QueryPointsBuilder,
		ScoredPoint, ScrollPointsBuilder, SetPayloadPointsBuilder, SparseVectorParamsBuilder,
		SparseVectorsConfigBuilder, UpsertPointsBuilder, Value, Vector, VectorParamsBuilder,
		VectorsConfigBuilder, point_id::PointIdOptions,
	},
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use sift_access::AccessFilter;
use sift_domain::{AccessUpdate, CandidateItem, ChunkPayload, IndexedChunk, chunk_key};

use crate::{Error, Result, filter, payload};

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &sift_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Creates the collection and its payload indexes when they are missing.
	pub async fn ensure_collection(&self) -> Result<()> {
		if !self.client.collection_exists(self.collection.clone()).await? {
			let mut vectors_config = VectorsConfigBuilder::default();

			vectors_config.add_named_vector_params(
				DENSE_VECTOR_NAME,
				VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine),
			);

			let mut sparse_vectors_config = SparseVectorsConfigBuilder::default();

			sparse_vectors_config.add_named_vector_params(
				BM25_VECTOR_NAME,
				SparseVectorParamsBuilder::default().modifier(Modifier::Idf as i32),
			);

			let builder = CreateCollectionBuilder::new(self.collection.clone())
				.vectors_config(vectors_config)
				.sparse_vectors_config(sparse_vectors_config);

			self.client.create_collection(builder).await?;

			tracing::info!(collection = %self.collection, "Qdrant collection created.");
		}

		let mut indexes: Vec<(&str, FieldType)> =
			KEYWORD_INDEX_FIELDS.iter().map(|field| (*field, FieldType::Keyword)).collect();

		indexes.push(("security_level", FieldType::Integer));

		for (field_name, field_type) in indexes {
			let request = CreateFieldIndexCollection {
				collection_name: self.collection.clone(),
				wait: Some(true),
				field_name: field_name.to_string(),
				field_type: Some(field_type as i32),
				field_index_params: None,
				ordering: None,
			};

			self.client.create_field_index(request).await?;
		}

		Ok(())
	}

	pub async fn dense_search(
		&self,
		vector: &[f32],
		access: &AccessFilter,
		limit: u32,
	) -> Result<Vec<CandidateItem>> {
		if vector.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"Query vector has {} dimensions, expected {}.",
				vector.len(),
				self.vector_dim
			)));
		}
		if access.matches_nothing() || limit == 0 {
			return Ok(Vec::new());
		}

		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector.to_vec()))
			.using(DENSE_VECTOR_NAME)
			.filter(filter::access_filter(access))
			.limit(limit as u64)
			.with_payload(true);
		let response = self.client.query(search).await?;

		Ok(collect_candidates(response.result))
	}

	/// Server-side BM25 over the sparse vector, scoped by space and doc types only.
	pub async fn bm25_search(
		&self,
		query: &str,
		space_id: &str,
		doc_types: Option<&[String]>,
		limit: u32,
	) -> Result<Vec<CandidateItem>> {
		if doc_types.is_some_and(<[String]>::is_empty) || limit == 0 || query.trim().is_empty() {
			return Ok(Vec::new());
		}

		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(Document::new(query.to_string(), BM25_MODEL)))
			.using(BM25_VECTOR_NAME)
			.filter(filter::scope_filter(space_id, doc_types))
			.limit(limit as u64)
			.with_payload(true);
		let response = self.client.query(search).await?;

		Ok(collect_candidates(response.result))
	}

	pub async fn upsert_chunks(&self, chunks: &[IndexedChunk]) -> Result<()> {
		if chunks.is_empty() {
			return Ok(());
		}

		let mut points = Vec::with_capacity(chunks.len());

		for chunk in chunks {
			if chunk.vector.len() != self.vector_dim as usize {
				return Err(Error::InvalidArgument(format!(
					"Chunk {} has {} dimensions, expected {}.",
					chunk.key,
					chunk.vector.len(),
					self.vector_dim
				)));
			}

			let mut vector_map = HashMap::new();

			vector_map.insert(DENSE_VECTOR_NAME.to_string(), Vector::from(chunk.vector.clone()));
			vector_map.insert(
				BM25_VECTOR_NAME.to_string(),
				Vector::from(Document::new(chunk.payload.text.clone(), BM25_MODEL)),
			);

			points.push(PointStruct::new(
				point_id(&chunk.key),
				vector_map,
				payload::to_payload(&chunk.payload)?,
			));
		}

		let upsert = UpsertPointsBuilder::new(self.collection.clone(), points).wait(true);

		self.client.upsert_points(upsert).await?;

		Ok(())
	}

	pub async fn doc_chunks(&self, space_id: &str, doc_id: &str) -> Result<Vec<ChunkPayload>> {
		self.scroll(filter::document_filter(space_id, doc_id)).await
	}

	pub async fn owned_chunks(&self, space_id: &str, owner_id: &str) -> Result<Vec<ChunkPayload>> {
		self.scroll(filter::owner_filter(space_id, owner_id)).await
	}

	pub async fn delete_doc(&self, space_id: &str, doc_id: &str) -> Result<()> {
		let delete = DeletePointsBuilder::new(self.collection.clone())
			.points(filter::document_filter(space_id, doc_id))
			.wait(true);

		self.client.delete_points(delete).await?;

		Ok(())
	}

	/// Overwrites the access fields named in `update` on every chunk of the document.
	pub async fn update_doc_access(
		&self,
		space_id: &str,
		doc_id: &str,
		update: &AccessUpdate,
	) -> Result<()> {
		let JsonValue::Object(fields) = serde_json::to_value(update)? else {
			return Err(Error::InvalidArgument("Access update must be an object.".to_string()));
		};

		if fields.is_empty() {
			return Ok(());
		}

		let mut payload = Payload::new();

		for (key, value) in fields {
			payload.insert(key, Value::from(value));
		}

		let request = SetPayloadPointsBuilder::new(self.collection.clone(), payload)
			.points_selector(filter::document_filter(space_id, doc_id))
			.wait(true);

		self.client.set_payload(request).await?;

		Ok(())
	}

	async fn scroll(&self, filter: Filter) -> Result<Vec<ChunkPayload>> {
		let mut out = Vec::new();
		let mut offset: Option<PointId> = None;

		loop {
			let mut request = ScrollPointsBuilder::new(self.collection.clone())
				.filter(filter.clone())
				.limit(SCROLL_PAGE_SIZE)
				.with_payload(true);

			if let Some(offset) = offset.take() {
				request = request.offset(offset);
			}

			let response = self.client.scroll(request).await?;

			for point in response.result {
				match payload::from_payload(point.payload) {
					Ok(payload) => out.push(payload),
					Err(err) => {
						tracing::warn!(error = %err, "Skipping chunk with undecodable payload.");
					},
				}
			}

			match response.next_page_offset {
				Some(next) => offset = Some(next),
				None => break,
			}
		}

		Ok(out)
	}
}

/// Stable point id for a chunk key.
pub fn point_id(key: &str) -> String {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}

fn collect_candidates(points: Vec<ScoredPoint>) -> Vec<CandidateItem> {
	let mut out = Vec::with_capacity(points.len());

	for point in points {
		let fallback_key = point.id.as_ref().and_then(point_id_string);
		let payload = match payload::from_payload(point.payload) {
			Ok(payload) => payload,
			Err(err) => {
				tracing::warn!(
					point_id = ?fallback_key,
					error = %err,
					"Skipping candidate with undecodable payload."
				);

				continue;
			},
		};
		let key = match (payload.doc_id.as_deref(), payload.chunk_index) {
			(Some(doc_id), Some(chunk_index)) if !doc_id.is_empty() =>
				chunk_key(doc_id, chunk_index),
			_ => match fallback_key {
				Some(key) => key,
				None => continue,
			},
		};

		out.push(CandidateItem::new(key, point.score, payload));
	}

	out
}

fn point_id_string(point_id: &PointId) -> Option<String> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Some(id.clone()),
		Some(PointIdOptions::Num(id)) => Some(id.to_string()),
		None => None,
	}
}

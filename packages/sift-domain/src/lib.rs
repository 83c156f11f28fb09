pub mod candidate;
pub mod doc_type;
pub mod document;
pub mod text;

pub use candidate::{CandidateItem, ChunkPayload, Visibility, chunk_key};
pub use document::{AccessUpdate, IndexedChunk, OwnedDocument};

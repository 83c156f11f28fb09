//! Conversion between [`ChunkPayload`] and Qdrant point payloads.

use std::collections::HashMap;

use qdrant_client::{
	client::Payload,
	qdrant::{Value, value::Kind},
};
use serde_json::{Map, Number, Value as JsonValue};

use sift_domain::ChunkPayload;

use crate::{Error, Result};

pub fn to_payload(payload: &ChunkPayload) -> Result<Payload> {
	Ok(Payload::from(to_map(payload)?))
}

pub fn from_payload(payload: HashMap<String, Value>) -> Result<ChunkPayload> {
	let fields: Map<String, JsonValue> =
		payload.into_iter().map(|(key, value)| (key, to_json(value))).collect();

	Ok(serde_json::from_value(JsonValue::Object(fields))?)
}

fn to_map(payload: &ChunkPayload) -> Result<HashMap<String, Value>> {
	let JsonValue::Object(fields) = serde_json::to_value(payload)? else {
		return Err(Error::InvalidArgument(
			"Chunk payload must serialize to an object.".to_string(),
		));
	};

	Ok(fields.into_iter().map(|(key, value)| (key, Value::from(value))).collect())
}

fn to_json(value: Value) -> JsonValue {
	match value.kind {
		None | Some(Kind::NullValue(_)) => JsonValue::Null,
		Some(Kind::BoolValue(flag)) => JsonValue::Bool(flag),
		Some(Kind::IntegerValue(number)) => JsonValue::from(number),
		Some(Kind::DoubleValue(number)) =>
			Number::from_f64(number).map(JsonValue::Number).unwrap_or(JsonValue::Null),
		Some(Kind::StringValue(text)) => JsonValue::String(text),
		Some(Kind::ListValue(list)) =>
			JsonValue::Array(list.values.into_iter().map(to_json).collect()),
		Some(Kind::StructValue(object)) => JsonValue::Object(
			object.fields.into_iter().map(|(key, value)| (key, to_json(value))).collect(),
		),
	}
}

#[cfg(test)]
mod tests {
	use sift_domain::Visibility;

	use super::*;

	#[test]
	fn access_fields_survive_the_store_format() {
		let mut payload = ChunkPayload {
			text: "Release checklist".to_string(),
			doc_id: Some("d1".to_string()),
			chunk_index: Some(3),
			doc_type: "technical_docs".to_string(),
			space_id: Some("s1".to_string()),
			owner_id: Some("u1".to_string()),
			visibility: Visibility::Private,
			access_list: vec!["u2".to_string()],
			security_level: 2,
			department: "engineering".to_string(),
			..Default::default()
		};

		payload.extra.insert("source".to_string(), JsonValue::from("wiki"));

		let stored = to_map(&payload).expect("Failed to encode payload.");
		let decoded = from_payload(stored).expect("Failed to decode payload.");

		assert_eq!(decoded, payload);
	}

	#[test]
	fn malformed_access_field_is_rejected() {
		let stored = HashMap::from([("visibility".to_string(), Value::from("secret".to_string()))]);

		assert!(from_payload(stored).is_err());
	}
}

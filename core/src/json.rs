//! JSON capability contracts.
//!
//! # Design
//! A response is parsed into an untyped `serde_json::Value` first and then
//! handed to exactly one of two entry points, chosen by the caller:
//! `decode_object` for types built from a JSON object and `decode_array` for
//! types built from a top-level array of objects. Each entry point rejects the
//! other root shape instead of coercing it.
//!
//! `Decodable` and `Encodable` are blanket-implemented over serde, so a model
//! opts in with `#[derive(Deserialize)]` / `#[derive(Serialize)]`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{json_kind, DecodeError, EncodeError};

/// A JSON object: string keys to JSON values.
pub type JsonObject = serde_json::Map<String, Value>;

/// A type that can be constructed from a JSON object.
pub trait Decodable: Sized {
    fn decode(json: JsonObject) -> Result<Self, DecodeError>;
}

impl<T: DeserializeOwned> Decodable for T {
    fn decode(json: JsonObject) -> Result<Self, DecodeError> {
        serde_json::from_value(Value::Object(json)).map_err(DecodeError::Field)
    }
}

/// A type that can be constructed from a top-level JSON array of objects.
pub trait ArrayDecodable: Sized {
    fn decode_array(items: Vec<JsonObject>) -> Result<Self, DecodeError>;
}

/// A type that can render itself as a JSON object for a request body.
pub trait Encodable {
    fn encode(&self) -> Result<JsonObject, EncodeError>;
}

impl<T: Serialize + ?Sized> Encodable for T {
    fn encode(&self) -> Result<JsonObject, EncodeError> {
        match serde_json::to_value(self).map_err(EncodeError::Serialize)? {
            Value::Object(map) => Ok(map),
            other => Err(EncodeError::NotAnObject {
                found: json_kind(&other),
            }),
        }
    }
}

/// Parse a response body into an untyped JSON value.
pub fn parse_body(bytes: &[u8]) -> Result<Value, DecodeError> {
    serde_json::from_slice(bytes).map_err(DecodeError::Syntax)
}

/// Decode `value` through the object path. Anything but an object fails.
pub fn decode_object<T: Decodable>(value: Value) -> Result<T, DecodeError> {
    match value {
        Value::Object(map) => T::decode(map),
        other => Err(DecodeError::ExpectedObject {
            found: json_kind(&other),
        }),
    }
}

/// Decode `value` through the array path. The root must be an array whose
/// elements are all objects.
pub fn decode_array<T: ArrayDecodable>(value: Value) -> Result<T, DecodeError> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(DecodeError::ExpectedArray {
                found: json_kind(&other),
            })
        }
    };
    let objects = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(DecodeError::Element {
                index,
                source: Box::new(DecodeError::ExpectedObject {
                    found: json_kind(&other),
                }),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    T::decode_array(objects)
}

//! Normalization of list payloads.
//!
//! Depending on the endpoint and its paging setup, the upstream returns a list either bare
//! (`[...]`) or wrapped in an envelope (`{"items": [...]}` or `{"content": [...]}`). Callers
//! should not need to know which; [`Listing`] records the shape that was found so that a
//! missing list can be told apart from an empty one.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Which envelope a list payload arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingShape {
    Bare,
    Items,
    Content,
    /// Neither a list nor a recognized envelope.
    Missing,
}

fn unwrap_listing(value: Value) -> (ListingShape, Vec<Value>) {
    match value {
        Value::Array(records) => (ListingShape::Bare, records),
        Value::Object(mut fields) => {
            if let Some(Value::Array(records)) = fields.get_mut("items").map(Value::take) {
                return (ListingShape::Items, records);
            }
            if let Some(Value::Array(records)) = fields.get_mut("content").map(Value::take) {
                return (ListingShape::Content, records);
            }
            (ListingShape::Missing, Vec::new())
        }
        _ => (ListingShape::Missing, Vec::new()),
    }
}

/// Returns the records of a bare or enveloped list, or nothing if the payload is neither.
pub fn normalize(value: Value) -> Vec<Value> {
    unwrap_listing(value).1
}

/// A decoded list payload together with the envelope it arrived in.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub shape: ListingShape,
    pub records: Vec<T>,
}

impl<T: DeserializeOwned> Listing<T> {
    /// Unwraps the envelope and decodes every record as `T`.
    ///
    /// A record that does not decode fails the whole listing rather than being dropped.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let (shape, records) = unwrap_listing(value);
        let records = records.into_iter().map(serde_json::from_value).collect::<Result<Vec<T>, _>>()?;
        Ok(Self { shape, records })
    }
}

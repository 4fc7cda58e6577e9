//! Request and response bodies of the dump and nlp endpoints.

use crate::model::SearchMetadata;
use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const PEEK_PATH: &str = "dump/peek";
pub const FETCH_PATH: &str = "dump/fetch";
pub const PROCESS_PATH: &str = "nlp/process";
pub const MODEL_TYPE: &str = "aioner";

/// `dump/peek?term=...` with the term form-urlencoded.
pub fn peek_path(term: &str) -> String {
    let query: String = url::form_urlencoded::Serializer::new(String::new()).append_pair("term", term).finish();
    format!("{PEEK_PATH}?{query}")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeekResponse {
    #[serde(deserialize_with = "lenient_count")]
    pub count: u64,
}

// The backend has been seen sending the count both as a number and as a numeric string.
fn lenient_count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(d)?;
    let parsed = match &value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| de::Error::custom(format!("count is not a non-negative number: {value}")))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub terms: Vec<String>,
    pub max_results: usize,
}

/// `metadata` is optional: a response without it is a no-op for the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
    #[serde(default)]
    pub metadata: Option<SearchMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub entries: Vec<Entry>,
    pub model_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagResult {
    pub id: String,
    /// Tag category (e.g. "Gene", "Disease") to tags, in the order the service emitted them.
    #[serde(default)]
    pub result: IndexMap<String, Vec<String>>,
}

impl TagResult {
    /// Tags of all categories flattened in order, duplicates dropped.
    pub fn tagline(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for tag in self.result.values().flatten() {
            if !out.iter().any(|t| t == tag) { out.push(tag.clone()); }
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResponse {
    #[serde(default)]
    pub results: Vec<TagResult>,
}

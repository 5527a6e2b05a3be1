use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePageRequest {
    pub slug: String,
    pub title: String,
}

/// Draft mutation payload. `mode: "schema"` replaces the content tree
/// wholesale; `mode: "patches"` applies a validated JSON-Patch batch.
///
/// `patches` stays untyped here so that malformed batches reach the patch
/// validator and come back as its aggregate error list instead of dying in
/// deserialization.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SavePayload {
    Schema { schema: Value },
    Patches { patches: Value },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePageRequest {
    /// Last draft version the caller observed. When present and stale the
    /// save is rejected with the current version; the caller re-fetches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_version: Option<u64>,
    #[serde(flatten)]
    pub payload: SavePayload,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenamePageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicatePageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub copy_published: bool,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::patch::PatchOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Draft,
    Published,
}

/// Which blob of a record a history entry moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobTarget {
    Draft,
    Published,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryOp {
    Save,
    Publish,
    Revert,
}

/// The working copy of a page. `schema` is the arbitrary content tree the
/// editor operates on; its internal shape is opaque at this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionBlob {
    pub schema: Value,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

/// The publicly served snapshot. `schema` stays `None` until first publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedBlob {
    pub schema: Option<Value>,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

/// One entry of the append-only audit trail. `patch` carries the diff the
/// operation produced, when there was one (renames append diff-less entries).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub op: HistoryOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Vec<PatchOp>>,
    pub from_version: u64,
    pub to_version: u64,
    pub target: BlobTarget,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub status: PageStatus,
    pub draft: VersionBlob,
    pub published: PublishedBlob,
    pub history: Vec<HistoryItem>,
}

impl PageRecord {
    /// Fresh unpublished record with an empty content tree.
    pub fn new(slug: String, title: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            slug,
            title,
            status: PageStatus::Draft,
            draft: VersionBlob {
                schema: json!({}),
                version: 1,
                updated_at: now,
            },
            published: PublishedBlob {
                schema: None,
                version: 0,
                updated_at: now,
            },
            history: Vec::new(),
        }
    }

    pub fn summary(&self) -> PageSummary {
        PageSummary {
            id: self.id,
            slug: self.slug.clone(),
            title: self.title.clone(),
            status: self.status,
        }
    }
}

/// Listing projection; everything the pages index needs and nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub status: PageStatus,
}

/// Public read projection, served from `published` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPage {
    pub slug: String,
    pub title: String,
    pub schema: Value,
}

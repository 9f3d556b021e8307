//! Record Module
//!
//! Defines the unit of storage: a text or file share plus its metadata.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::blob::BlobMeta;

// == Record Content ==
/// Payload of a record. Exactly one of inline text or a blob reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RecordContent {
    /// Inline text share
    #[serde(rename_all = "camelCase")]
    Text { text_content: String },
    /// Reference to a payload held by blob storage
    #[serde(rename_all = "camelCase")]
    File {
        file_name: String,
        content_type: Option<String>,
        size: u64,
        /// Empty when the blob link was lost; see `persistence::repair`
        #[serde(default, deserialize_with = "null_as_empty")]
        location: String,
    },
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// == Record ==
/// A share as held in the cache and written to the metadata snapshot.
///
/// `created_at` is fixed at creation and is the only input to expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Short share code, unique among live records
    pub id: String,
    /// Text or blob payload
    #[serde(flatten)]
    pub content: RecordContent,
    /// Display hint, opaque to storage
    #[serde(default)]
    pub rich_text: bool,
    /// Creation instant
    pub created_at: DateTime<Utc>,
    /// Number of successful fetches (best-effort durability)
    #[serde(default)]
    pub view_count: u64,
}

impl Record {
    // == Constructors ==
    /// Creates a text record with a zero view count.
    pub fn text(
        id: impl Into<String>,
        text: impl Into<String>,
        rich_text: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            content: RecordContent::Text {
                text_content: text.into(),
            },
            rich_text,
            created_at,
            view_count: 0,
        }
    }

    /// Creates a file record referencing an already stored blob.
    pub fn file(
        id: impl Into<String>,
        blob: BlobMeta,
        rich_text: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            content: RecordContent::File {
                file_name: blob.file_name,
                content_type: blob.content_type,
                size: blob.size,
                location: blob.location,
            },
            rich_text,
            created_at,
            view_count: 0,
        }
    }

    // == Accessors ==
    pub fn is_file(&self) -> bool {
        matches!(self.content, RecordContent::File { .. })
    }

    pub fn text_content(&self) -> Option<&str> {
        match &self.content {
            RecordContent::Text { text_content } => Some(text_content),
            RecordContent::File { .. } => None,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match &self.content {
            RecordContent::File { location, .. } => Some(location),
            RecordContent::Text { .. } => None,
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        match &self.content {
            RecordContent::File { file_name, .. } => Some(file_name),
            RecordContent::Text { .. } => None,
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        match &self.content {
            RecordContent::File { content_type, .. } => content_type.as_deref(),
            RecordContent::Text { .. } => None,
        }
    }

    /// Blob size in bytes, or text length in characters.
    pub fn size(&self) -> u64 {
        match &self.content {
            RecordContent::Text { text_content } => text_content.chars().count() as u64,
            RecordContent::File { size, .. } => *size,
        }
    }

    // == Liveness ==
    /// Returns true while `now - created_at < ttl`.
    ///
    /// The boundary instant `created_at + ttl` is already expired.
    pub fn is_live(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.created_at) < ttl
    }

    /// Instant at which the record stops being live.
    pub fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        self.created_at + ttl
    }

    /// Exactly one of non-empty text or non-empty location.
    pub fn is_well_formed(&self) -> bool {
        if self.id.is_empty() {
            return false;
        }
        match &self.content {
            RecordContent::Text { text_content } => !text_content.is_empty(),
            RecordContent::File { location, .. } => !location.is_empty(),
        }
    }
}

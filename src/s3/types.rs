//! Object storage data types.
//!
//! Descriptors serialise with AWS-style `PascalCase` field names, matching
//! what S3 clients expect to see in a listing.

use bytes::Bytes;
use serde::Serialize;

/// A bucket in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketInfo {
    /// Bucket name.
    pub name: String,
    /// Creation timestamp (RFC 3339), when the backend reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
}

impl BucketInfo {
    /// Creates a descriptor with no creation date.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            creation_date: None,
        }
    }
}

/// An object in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectInfo {
    /// Object key.
    pub key: String,
    /// Last modification timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Storage class, e.g. `STANDARD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    /// Entity tag.
    #[serde(rename = "ETag", skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
}

/// An object exactly as the backend returned it.
#[derive(Debug, Clone)]
pub struct RawObject {
    /// Object bytes.
    pub body: Bytes,
    /// Reported content type, if any.
    pub content_type: Option<String>,
}

/// Object payload after content sniffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectBody {
    /// Decoded text, or text extracted from a PDF.
    Text(String),
    /// Raw bytes of a binary object.
    Binary(Bytes),
}

/// A retrieved object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectData {
    /// The payload.
    pub data: ObjectBody,
    /// Content type, `application/octet-stream` when the backend reported none.
    pub content_type: String,
}

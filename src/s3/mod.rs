//! Object storage access.
//!
//! [`S3Resource`] applies the bucket allow-list and listing limits, and turns
//! raw objects into text or binary payloads. The store itself sits behind
//! [`StorageBackend`].

pub mod backend;
pub mod content;
pub mod types;

use std::sync::Arc;

use tracing::error;

pub use backend::{RustS3Backend, StorageBackend};
pub use types::{BucketInfo, ObjectBody, ObjectData, ObjectInfo, RawObject};

use crate::config::S3Settings;
use crate::error::StorageError;

/// Default number of keys returned by an object listing.
pub const DEFAULT_MAX_KEYS: usize = 1000;

/// Allow-list aware access to an object store.
pub struct S3Resource {
    backend: Arc<dyn StorageBackend>,
    allowed_buckets: Vec<String>,
    max_buckets: usize,
    log_errors: bool,
}

impl S3Resource {
    /// Creates a resource over `backend` with the given limits.
    #[must_use]
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        allowed_buckets: Vec<String>,
        max_buckets: usize,
    ) -> Self {
        Self {
            backend,
            allowed_buckets,
            max_buckets,
            log_errors: true,
        }
    }

    /// Creates a resource from storage settings.
    #[must_use]
    pub fn from_settings(backend: Arc<dyn StorageBackend>, settings: &S3Settings) -> Self {
        Self::new(
            backend,
            settings.allowed_buckets.clone(),
            settings.max_buckets,
        )
    }

    /// Enables or disables error logging.
    #[must_use]
    pub const fn with_logging(mut self, enabled: bool) -> Self {
        self.log_errors = enabled;
        self
    }

    /// Returns the configured allow-list. Empty means unrestricted.
    #[must_use]
    pub fn allowed_buckets(&self) -> &[String] {
        &self.allowed_buckets
    }

    /// Lists buckets, filtered by the allow-list and truncated to the
    /// configured maximum. Backend order is preserved.
    ///
    /// # Errors
    ///
    /// Returns the backend error unchanged.
    pub async fn list_buckets(&self) -> Result<Vec<BucketInfo>, StorageError> {
        let buckets = self
            .backend
            .list_buckets()
            .await
            .map_err(|e| self.log("Error listing buckets", e))?;

        Ok(buckets
            .into_iter()
            .filter(|bucket| self.allowed_buckets.is_empty() || self.is_allowed(&bucket.name))
            .take(self.max_buckets)
            .collect())
    }

    /// Lists objects in an allowed bucket.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AccessDenied`] before contacting the backend if
    /// the bucket is not allowed, otherwise the backend error unchanged.
    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: usize,
    ) -> Result<Vec<ObjectInfo>, StorageError> {
        let context = || format!("Error listing objects in bucket {bucket}");
        self.check_access(bucket)
            .map_err(|e| self.log(&context(), e))?;

        self.backend
            .list_objects(bucket, prefix, max_keys)
            .await
            .map_err(|e| self.log(&context(), e))
    }

    /// Fetches an object from an allowed bucket.
    ///
    /// Text objects are decoded as UTF-8 (lossily), PDFs are reduced to their
    /// extracted text, anything else is returned as bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AccessDenied`] before contacting the backend if
    /// the bucket is not allowed, otherwise the backend error unchanged.
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectData, StorageError> {
        let context = || format!("Error getting object {key} from bucket {bucket}");
        self.check_access(bucket)
            .map_err(|e| self.log(&context(), e))?;

        let raw = self
            .backend
            .get_object(bucket, key)
            .await
            .map_err(|e| self.log(&context(), e))?;

        let content_type = raw
            .content_type
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| content::DEFAULT_CONTENT_TYPE.to_string());

        let data = if content::is_text_file(key, &content_type) {
            ObjectBody::Text(String::from_utf8_lossy(&raw.body).into_owned())
        } else if content::is_pdf_file(key, &content_type) {
            ObjectBody::Text(self.pdf_text(&raw.body))
        } else {
            ObjectBody::Binary(raw.body)
        };

        Ok(ObjectData { data, content_type })
    }

    fn is_allowed(&self, bucket: &str) -> bool {
        self.allowed_buckets.iter().any(|allowed| allowed == bucket)
    }

    fn check_access(&self, bucket: &str) -> Result<(), StorageError> {
        if self.allowed_buckets.is_empty() || self.is_allowed(bucket) {
            Ok(())
        } else {
            Err(StorageError::AccessDenied {
                bucket: bucket.to_string(),
            })
        }
    }

    fn pdf_text(&self, bytes: &[u8]) -> String {
        content::pdf_to_text(bytes).unwrap_or_else(|e| {
            if self.log_errors {
                error!(error = %e, "Error converting PDF to text");
            }
            content::PDF_EXTRACTION_FAILED.to_string()
        })
    }

    fn log(&self, context: &str, error: StorageError) -> StorageError {
        if self.log_errors {
            error!(error = %error, "{context}");
        }
        error
    }
}

//! Storage backends.
//!
//! [`StorageBackend`] is the seam between the tools and the object store.
//! [`RustS3Backend`] talks to AWS S3 or any S3-compatible endpoint.

use async_trait::async_trait;
use ::s3::creds::Credentials;
use ::s3::region::Region;
use ::s3::Bucket;
use tracing::debug;

use crate::config::S3Settings;
use crate::error::StorageError;
use crate::s3::types::{BucketInfo, ObjectInfo, RawObject};

/// Operations the tools need from an object store.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Lists every bucket visible to the credentials, in backend order.
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, StorageError>;

    /// Lists up to `max_keys` objects whose keys start with `prefix`.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: usize,
    ) -> Result<Vec<ObjectInfo>, StorageError>;

    /// Fetches one object.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<RawObject, StorageError>;
}

/// Backend built on the `rust-s3` client.
pub struct RustS3Backend {
    region: Region,
    credentials: Credentials,
    path_style: bool,
}

impl RustS3Backend {
    /// Creates a backend from storage settings.
    ///
    /// Explicit credentials win; otherwise the ambient credential chain is
    /// used, and anonymous access if that yields nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the region or credentials cannot be set up.
    pub fn from_settings(settings: &S3Settings) -> Result<Self, StorageError> {
        let region = match settings.endpoint {
            Some(ref endpoint) => Region::Custom {
                region: settings.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => settings
                .region
                .parse()
                .map_err(|e| StorageError::Configuration {
                    message: format!("invalid region {}: {e}", settings.region),
                })?,
        };

        let credentials = match settings.credentials {
            Some(ref creds) => Credentials::new(
                Some(&creds.access_key_id),
                Some(&creds.secret_access_key),
                None,
                None,
                None,
            ),
            None => Credentials::default().or_else(|_| Credentials::anonymous()),
        }
        .map_err(|e| StorageError::Configuration {
            message: format!("invalid credentials: {e}"),
        })?;

        debug!(
            region = %settings.region,
            endpoint = settings.endpoint.as_deref().unwrap_or("-"),
            path_style = settings.force_path_style,
            "Storage backend configured"
        );

        Ok(Self {
            region,
            credentials,
            path_style: settings.force_path_style,
        })
    }

    fn bucket(&self, name: &str) -> Result<Box<Bucket>, StorageError> {
        let bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())
            .map_err(StorageError::backend)?;
        Ok(if self.path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }
}

#[async_trait]
impl StorageBackend for RustS3Backend {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, StorageError> {
        let response = Bucket::list_buckets(self.region.clone(), self.credentials.clone())
            .await
            .map_err(StorageError::backend)?;

        Ok(response
            .buckets
            .bucket
            .into_iter()
            .map(|bucket| BucketInfo {
                // Creation dates serialise as RFC 3339 strings.
                creation_date: serde_json::to_value(&bucket.creation_date)
                    .ok()
                    .and_then(|v| v.as_str().map(String::from)),
                name: bucket.name,
            })
            .collect())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: usize,
    ) -> Result<Vec<ObjectInfo>, StorageError> {
        let (page, _status) = self
            .bucket(bucket)?
            .list_page(prefix.to_string(), None, None, None, Some(max_keys))
            .await
            .map_err(StorageError::backend)?;

        Ok(page
            .contents
            .into_iter()
            .map(|object| ObjectInfo {
                key: object.key,
                last_modified: Some(object.last_modified),
                size: object.size,
                storage_class: object.storage_class,
                e_tag: object.e_tag,
            })
            .collect())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<RawObject, StorageError> {
        let response = self
            .bucket(bucket)?
            .get_object(key)
            .await
            .map_err(StorageError::backend)?;

        let content_type = response
            .headers()
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value);

        Ok(RawObject {
            body: response.bytes().clone(),
            content_type,
        })
    }
}

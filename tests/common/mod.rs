//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use s3_mcp::error::StorageError;
use s3_mcp::mcp::server::McpServer;
use s3_mcp::s3::{BucketInfo, ObjectInfo, RawObject, S3Resource, StorageBackend};
use s3_mcp::tools::create_tools;

/// In-memory storage backend with two buckets and a handful of objects.
#[derive(Default)]
pub struct MockBackend {
    pub calls: AtomicUsize,
}

impl MockBackend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            BucketInfo {
                name: "test-bucket-1".to_string(),
                creation_date: Some("2024-01-01T00:00:00Z".to_string()),
            },
            BucketInfo {
                name: "test-bucket-2".to_string(),
                creation_date: Some("2024-01-02T00:00:00Z".to_string()),
            },
            BucketInfo::named("hidden-bucket"),
        ])
    }

    async fn list_objects(
        &self,
        _bucket: &str,
        prefix: &str,
        max_keys: usize,
    ) -> Result<Vec<ObjectInfo>, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(["docs/readme.txt", "docs/report.pdf", "images/logo.png"]
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .take(max_keys)
            .map(|key| ObjectInfo {
                key: key.to_string(),
                last_modified: Some("2024-01-01T00:00:00.000Z".to_string()),
                size: 13,
                storage_class: Some("STANDARD".to_string()),
                e_tag: None,
            })
            .collect())
    }

    async fn get_object(&self, _bucket: &str, key: &str) -> Result<RawObject, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match key {
            "docs/readme.txt" => Ok(RawObject {
                body: Bytes::from_static(b"Hello, World!"),
                content_type: Some("text/plain".to_string()),
            }),
            "images/logo.png" => Ok(RawObject {
                body: Bytes::from_static(&[0x89, b'P', b'N', b'G']),
                content_type: Some("image/png".to_string()),
            }),
            _ => Err(StorageError::backend("The specified key does not exist.")),
        }
    }
}

/// Builds a server whose tools only see the two test buckets.
pub fn server_with(backend: Arc<MockBackend>) -> Arc<McpServer> {
    let s3 = S3Resource::new(
        backend,
        vec!["test-bucket-1".to_string(), "test-bucket-2".to_string()],
        5,
    )
    .with_logging(false);
    Arc::new(McpServer::new(create_tools(&Arc::new(s3))))
}

pub fn server() -> Arc<McpServer> {
    server_with(Arc::new(MockBackend::default()))
}

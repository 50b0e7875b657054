//! The `list-objects` tool.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::mcp::server::ToolCallResult;
use crate::s3::{S3Resource, DEFAULT_MAX_KEYS};
use crate::tools::{json_result, parse_arguments, Tool, ToolError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Arguments {
    bucket: String,
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default, deserialize_with = "whole_number")]
    max_keys: Option<usize>,
}

/// Accepts any JSON number, truncating fractions. Zero and negative values
/// read as absent.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_number<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.map(f64::trunc).filter(|n| *n >= 1.0).map(|n| n as usize))
}

/// Lists objects in one bucket.
pub struct ListObjectsTool {
    s3: Arc<S3Resource>,
}

impl ListObjectsTool {
    /// Creates the tool.
    #[must_use]
    pub const fn new(s3: Arc<S3Resource>) -> Self {
        Self { s3 }
    }
}

#[async_trait]
impl Tool for ListObjectsTool {
    fn name(&self) -> &'static str {
        "list-objects"
    }

    fn description(&self) -> &'static str {
        "List objects in an S3 bucket"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "bucket": {
                    "type": "string",
                    "description": "Name of the S3 bucket"
                },
                "prefix": {
                    "type": "string",
                    "description": "Prefix to filter objects (like a folder)"
                },
                "maxKeys": {
                    "type": "number",
                    "description": "Maximum number of objects to return"
                }
            },
            "required": ["bucket"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolCallResult, ToolError> {
        let args: Arguments = parse_arguments(arguments)?;
        let prefix = args.prefix.unwrap_or_default();
        let max_keys = args.max_keys.unwrap_or(DEFAULT_MAX_KEYS);

        Ok(
            match self.s3.list_objects(&args.bucket, &prefix, max_keys).await {
                Ok(objects) => json_result(&objects),
                Err(e) => ToolCallResult::error(format!(
                    "Error listing objects in bucket {}: {e}",
                    args.bucket
                )),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::ObjectInfo;
    use crate::tools::testing::FakeBackend;

    fn object(key: &str, size: u64) -> ObjectInfo {
        ObjectInfo {
            key: key.to_string(),
            last_modified: Some("2024-01-01T00:00:00.000Z".to_string()),
            size,
            storage_class: Some("STANDARD".to_string()),
            e_tag: None,
        }
    }

    fn tool(allowed: &[&str]) -> ListObjectsTool {
        let backend = FakeBackend {
            objects: vec![
                object("docs/a.txt", 10),
                object("docs/b.txt", 20),
                object("images/c.png", 30),
            ],
            ..FakeBackend::default()
        };
        let allowed = allowed.iter().map(ToString::to_string).collect();
        let s3 = S3Resource::new(Arc::new(backend), allowed, 5).with_logging(false);
        ListObjectsTool::new(Arc::new(s3))
    }

    #[tokio::test]
    async fn lists_with_prefix_and_limit() {
        let result = tool(&[])
            .execute(json!({ "bucket": "b", "prefix": "docs/", "maxKeys": 1 }))
            .await
            .unwrap();

        let objects: Value = serde_json::from_str(result.first_text().unwrap()).unwrap();
        let objects = objects.as_array().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0]["Key"], "docs/a.txt");
        assert_eq!(objects[0]["Size"], 10);
        assert_eq!(objects[0]["StorageClass"], "STANDARD");
    }

    #[tokio::test]
    async fn zero_max_keys_uses_default() {
        let result = tool(&[])
            .execute(json!({ "bucket": "b", "maxKeys": 0 }))
            .await
            .unwrap();

        let objects: Value = serde_json::from_str(result.first_text().unwrap()).unwrap();
        assert_eq!(objects.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn fractional_max_keys_is_truncated() {
        let result = tool(&[])
            .execute(json!({ "bucket": "b", "maxKeys": 2.0 }))
            .await
            .unwrap();
        let objects: Value = serde_json::from_str(result.first_text().unwrap()).unwrap();
        assert_eq!(objects.as_array().unwrap().len(), 2);

        let result = tool(&[])
            .execute(json!({ "bucket": "b", "maxKeys": 1.7 }))
            .await
            .unwrap();
        let objects: Value = serde_json::from_str(result.first_text().unwrap()).unwrap();
        assert_eq!(objects.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_numeric_max_keys_is_invalid_arguments() {
        let err = tool(&[])
            .execute(json!({ "bucket": "b", "maxKeys": "ten" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn denied_bucket_is_error_result() {
        let result = tool(&["allowed"])
            .execute(json!({ "bucket": "secret" }))
            .await
            .unwrap();

        assert!(result.is_error);
        assert_eq!(
            result.first_text(),
            Some(
                "Error: Error listing objects in bucket secret: \
                 Bucket secret is not in the allowed buckets list"
            )
        );
    }

    #[tokio::test]
    async fn missing_bucket_is_invalid_arguments() {
        let err = tool(&[]).execute(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}

//! The `get-object` tool.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::mcp::server::ToolCallResult;
use crate::s3::{ObjectBody, S3Resource};
use crate::tools::{parse_arguments, Tool, ToolError};

/// Number of base64 characters shown for binary objects.
const PREVIEW_CHARS: usize = 100;

/// Input bytes that encode to exactly [`PREVIEW_CHARS`] base64 characters.
const PREVIEW_BYTES: usize = PREVIEW_CHARS / 4 * 3;

#[derive(Debug, Deserialize)]
struct Arguments {
    bucket: String,
    key: String,
}

/// Retrieves one object as text, or a preview for binary content.
pub struct GetObjectTool {
    s3: Arc<S3Resource>,
}

impl GetObjectTool {
    /// Creates the tool.
    #[must_use]
    pub const fn new(s3: Arc<S3Resource>) -> Self {
        Self { s3 }
    }
}

#[async_trait]
impl Tool for GetObjectTool {
    fn name(&self) -> &'static str {
        "get-object"
    }

    fn description(&self) -> &'static str {
        "Retrieve an object from an S3 bucket"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "bucket": {
                    "type": "string",
                    "description": "Name of the S3 bucket"
                },
                "key": {
                    "type": "string",
                    "description": "Key (path) of the object to retrieve"
                }
            },
            "required": ["bucket", "key"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolCallResult, ToolError> {
        let args: Arguments = parse_arguments(arguments)?;

        Ok(match self.s3.get_object(&args.bucket, &args.key).await {
            Ok(object) => match object.data {
                ObjectBody::Text(text) => ToolCallResult::text(text),
                ObjectBody::Binary(bytes) => ToolCallResult::text(binary_preview(
                    &object.content_type,
                    &bytes,
                )),
            },
            Err(e) => ToolCallResult::error(format!(
                "Error getting object {} from bucket {}: {e}",
                args.key, args.bucket
            )),
        })
    }
}

fn binary_preview(content_type: &str, bytes: &[u8]) -> String {
    let preview = STANDARD.encode(&bytes[..bytes.len().min(PREVIEW_BYTES)]);
    format!("Binary content ({content_type}): base64 data is {preview}...")
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::s3::RawObject;
    use crate::tools::testing::FakeBackend;

    fn tool(body: Vec<u8>, content_type: Option<&str>) -> GetObjectTool {
        let backend = FakeBackend {
            object: Some(RawObject {
                body: Bytes::from(body),
                content_type: content_type.map(String::from),
            }),
            ..FakeBackend::default()
        };
        let s3 = S3Resource::new(Arc::new(backend), Vec::new(), 5).with_logging(false);
        GetObjectTool::new(Arc::new(s3))
    }

    #[tokio::test]
    async fn text_is_returned_verbatim() {
        let result = tool(b"Hello, World!".to_vec(), Some("text/plain"))
            .execute(json!({ "bucket": "b", "key": "hello.txt" }))
            .await
            .unwrap();

        assert!(!result.is_error);
        assert_eq!(result.first_text(), Some("Hello, World!"));
    }

    #[tokio::test]
    async fn binary_gets_truncated_preview() {
        let result = tool(vec![0u8; 300], Some("image/png"))
            .execute(json!({ "bucket": "b", "key": "blank.png" }))
            .await
            .unwrap();

        let text = result.first_text().unwrap();
        let expected_prefix = "Binary content (image/png): base64 data is ";
        assert!(text.starts_with(expected_prefix));
        assert!(text.ends_with("..."));
        assert_eq!(text.len(), expected_prefix.len() + PREVIEW_CHARS + 3);
    }

    #[test]
    fn preview_matches_prefix_of_full_encoding() {
        let bytes: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let full = STANDARD.encode(&bytes);

        let text = binary_preview("image/png", &bytes);
        let preview = text
            .strip_prefix("Binary content (image/png): base64 data is ")
            .and_then(|rest| rest.strip_suffix("..."))
            .unwrap();
        assert_eq!(preview, &full[..PREVIEW_CHARS]);
    }

    #[test]
    fn short_binary_preview_is_whole() {
        assert_eq!(
            binary_preview("application/octet-stream", b"abc"),
            "Binary content (application/octet-stream): base64 data is YWJj..."
        );
    }

    #[tokio::test]
    async fn backend_failure_names_object_and_bucket() {
        let backend = FakeBackend {
            error: Some("Access Denied"),
            ..FakeBackend::default()
        };
        let s3 = S3Resource::new(Arc::new(backend), Vec::new(), 5).with_logging(false);

        let result = GetObjectTool::new(Arc::new(s3))
            .execute(json!({ "bucket": "b", "key": "k" }))
            .await
            .unwrap();
        assert!(result.is_error);
        assert_eq!(
            result.first_text(),
            Some("Error: Error getting object k from bucket b: Access Denied")
        );
    }

    #[tokio::test]
    async fn key_is_required() {
        let err = tool(Vec::new(), None)
            .execute(json!({ "bucket": "b" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}

//! The `list-buckets` tool.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::mcp::server::ToolCallResult;
use crate::s3::S3Resource;
use crate::tools::{json_result, Tool, ToolError};

/// Lists the buckets visible through the allow-list.
pub struct ListBucketsTool {
    s3: Arc<S3Resource>,
}

impl ListBucketsTool {
    /// Creates the tool.
    #[must_use]
    pub const fn new(s3: Arc<S3Resource>) -> Self {
        Self { s3 }
    }
}

#[async_trait]
impl Tool for ListBucketsTool {
    fn name(&self) -> &'static str {
        "list-buckets"
    }

    fn description(&self) -> &'static str {
        "List available S3 buckets"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: Value) -> Result<ToolCallResult, ToolError> {
        Ok(match self.s3.list_buckets().await {
            Ok(buckets) => json_result(&buckets),
            Err(e) => ToolCallResult::error(format!("Error listing buckets: {e}")),
        })
    }
}

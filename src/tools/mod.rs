//! MCP tool implementations.
//!
//! These are the tools exposed to agents through the MCP protocol. Each one
//! wraps a single [`S3Resource`] operation.

pub mod get_object;
pub mod list_buckets;
pub mod list_objects;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::mcp::server::{ToolCallResult, ToolDefinition};
use crate::s3::S3Resource;

pub use get_object::GetObjectTool;
pub use list_buckets::ListBucketsTool;
pub use list_objects::ListObjectsTool;

/// Errors a tool reports at the protocol level rather than as a result.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The arguments do not match the tool's input schema.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

/// A named, schema-described operation callable through `tools/call`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name.
    fn name(&self) -> &'static str;

    /// Human-readable description.
    fn description(&self) -> &'static str;

    /// JSON Schema for the tool's arguments.
    fn input_schema(&self) -> Value;

    /// Runs the tool.
    ///
    /// Operational failures are reported as an error result, never as `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArguments`] if `arguments` does not match
    /// the input schema.
    async fn execute(&self, arguments: Value) -> Result<ToolCallResult, ToolError>;

    /// Returns the definition advertised by `tools/list`.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: Some(self.description().to_string()),
            input_schema: self.input_schema(),
        }
    }
}

/// Creates every tool, sharing one storage resource.
#[must_use]
pub fn create_tools(s3: &Arc<S3Resource>) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(ListBucketsTool::new(Arc::clone(s3))),
        Box::new(ListObjectsTool::new(Arc::clone(s3))),
        Box::new(GetObjectTool::new(Arc::clone(s3))),
    ]
}

/// Deserialises tool arguments, treating `null` as an empty object.
fn parse_arguments<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Renders a value as pretty-printed JSON text.
fn json_result<T: serde::Serialize>(value: &T) -> ToolCallResult {
    match serde_json::to_string_pretty(value) {
        Ok(text) => ToolCallResult::text(text),
        Err(e) => ToolCallResult::error(format!("Failed to serialise result: {e}")),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory backend shared by the tool tests.

    use async_trait::async_trait;

    use crate::error::StorageError;
    use crate::s3::{BucketInfo, ObjectInfo, RawObject, StorageBackend};

    #[derive(Default)]
    pub struct FakeBackend {
        pub buckets: Vec<BucketInfo>,
        pub objects: Vec<ObjectInfo>,
        pub object: Option<RawObject>,
        pub error: Option<&'static str>,
    }

    #[async_trait]
    impl StorageBackend for FakeBackend {
        async fn list_buckets(&self) -> Result<Vec<BucketInfo>, StorageError> {
            match self.error {
                Some(message) => Err(StorageError::backend(message)),
                None => Ok(self.buckets.clone()),
            }
        }

        async fn list_objects(
            &self,
            _bucket: &str,
            prefix: &str,
            max_keys: usize,
        ) -> Result<Vec<ObjectInfo>, StorageError> {
            match self.error {
                Some(message) => Err(StorageError::backend(message)),
                None => Ok(self
                    .objects
                    .iter()
                    .filter(|o| o.key.starts_with(prefix))
                    .take(max_keys)
                    .cloned()
                    .collect()),
            }
        }

        async fn get_object(&self, _bucket: &str, _key: &str) -> Result<RawObject, StorageError> {
            match (self.error, &self.object) {
                (Some(message), _) => Err(StorageError::backend(message)),
                (None, Some(object)) => Ok(object.clone()),
                (None, None) => Err(StorageError::backend("NoSuchKey")),
            }
        }
    }
}

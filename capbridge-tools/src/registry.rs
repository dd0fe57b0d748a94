//! Runtime registry for tool metadata and execution.

use std::future::Future;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use capbridge_primitives::{CapabilityDescriptor, CapabilityName, InputSpec};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Result alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Metadata describing a registered tool.
#[derive(Clone, Debug)]
pub struct ToolMetadata {
    name: CapabilityName,
    description: Option<String>,
    input: InputSpec,
}

impl ToolMetadata {
    /// Creates metadata for the supplied tool name with no declared input.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidMetadata`] if the name is not a valid
    /// capability name.
    pub fn new(name: impl Into<String>) -> ToolResult<Self> {
        let name = CapabilityName::new(name).map_err(|err| ToolError::InvalidMetadata {
            reason: err.to_string(),
        })?;

        Ok(Self {
            name,
            description: None,
            input: InputSpec::Absent,
        })
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declares the tool's input specification.
    #[must_use]
    pub fn with_input(mut self, input: InputSpec) -> Self {
        self.input = input;
        self
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the declared input specification.
    #[must_use]
    pub fn input(&self) -> &InputSpec {
        &self.input
    }

    /// Builds the capability descriptor advertised for this tool.
    #[must_use]
    pub fn descriptor(&self) -> CapabilityDescriptor {
        let descriptor = CapabilityDescriptor::new(self.name.clone(), self.input.clone());
        match &self.description {
            Some(description) => descriptor.with_description(description.clone()),
            None => descriptor,
        }
    }
}

/// Trait implemented by tool executors.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Invokes the tool with the given JSON input, returning JSON output.
    async fn invoke(&self, input: Value) -> ToolResult<Value>;
}

#[async_trait]
impl<F, Fut> Tool for F
where
    F: Send + Sync + Fn(Value) -> Fut,
    Fut: Future<Output = ToolResult<Value>> + Send,
{
    async fn invoke(&self, input: Value) -> ToolResult<Value> {
        (self)(input).await
    }
}

/// Handle returned by the registry for direct invocation.
#[derive(Clone)]
pub struct ToolHandle {
    metadata: ToolMetadata,
    executor: Arc<dyn Tool>,
}

impl ToolHandle {
    /// Returns the associated metadata.
    #[must_use]
    pub fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    /// Executes the underlying tool implementation.
    ///
    /// # Errors
    ///
    /// Propagates any [`ToolError::Execution`] returned by the underlying
    /// implementation.
    pub async fn invoke(&self, input: Value) -> ToolResult<Value> {
        self.executor.invoke(input).await
    }
}

/// Registry that stores tool implementations in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    inner: RwLock<Vec<ToolHandle>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read().expect("tool registry poisoned");
        let names: Vec<_> = inner.iter().map(|handle| handle.metadata.name()).collect();
        f.debug_struct("ToolRegistry")
            .field("registered", &names)
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool implementation.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if the name is already present.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn register_tool<T>(&self, metadata: ToolMetadata, tool: T) -> ToolResult<()>
    where
        T: Tool + 'static,
    {
        let mut inner = self.inner.write().expect("tool registry poisoned");
        if inner
            .iter()
            .any(|handle| handle.metadata.name() == metadata.name())
        {
            return Err(ToolError::DuplicateTool {
                name: metadata.name().to_owned(),
            });
        }

        debug!(tool = metadata.name(), "registered tool");
        inner.push(ToolHandle {
            metadata,
            executor: Arc::new(tool),
        });

        Ok(())
    }

    /// Returns a handle to the tool matching the supplied name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ToolHandle> {
        let inner = self.inner.read().ok()?;
        inner
            .iter()
            .find(|handle| handle.metadata.name() == name)
            .cloned()
    }

    /// Invokes a registered tool directly.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] when the tool is not found or
    /// propagates [`ToolError::Execution`] when the implementation fails.
    pub async fn invoke(&self, name: &str, input: Value) -> ToolResult<Value> {
        let handle = self.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_owned(),
        })?;
        handle.invoke(input).await
    }

    /// Lists the metadata of all registered tools in registration order.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn list(&self) -> Vec<ToolMetadata> {
        let inner = self.inner.read().expect("tool registry poisoned");
        inner
            .iter()
            .map(|handle| handle.metadata.clone())
            .collect()
    }
}

/// Errors produced by tool registration and invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool metadata failed validation.
    #[error("invalid tool metadata: {reason}")]
    InvalidMetadata {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Tool name collided with an existing registration.
    #[error("tool `{name}` is already registered")]
    DuplicateTool {
        /// Name of the offending tool.
        name: String,
    },

    /// Requested tool does not exist.
    #[error("tool `{name}` is not registered")]
    UnknownTool {
        /// Name of the missing tool.
        name: String,
    },

    /// Tool execution failed.
    #[error("tool execution failed: {reason}")]
    Execution {
        /// Human-readable error returned by the tool implementation.
        reason: String,
    },

    /// The backend could not enumerate its capabilities.
    #[error("capability listing failed: {reason}")]
    Listing {
        /// Human-readable reason reported by the backend.
        reason: String,
    },
}

impl ToolError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use capbridge_primitives::ParameterRecord;

    fn metadata() -> ToolMetadata {
        ToolMetadata::new("echo")
            .unwrap()
            .with_description("Echo incoming payload")
            .with_input(InputSpec::Parameters(vec![ParameterRecord::new(
                "message", "string",
            )]))
    }

    #[tokio::test]
    async fn register_and_invoke_tool() {
        let registry = ToolRegistry::new();
        registry
            .register_tool(metadata(), |input: Value| async move { Ok(input) })
            .unwrap();

        let payload = serde_json::json!({ "message": "hello" });
        let output = registry.invoke("echo", payload.clone()).await.unwrap();
        assert_eq!(output, payload);
    }

    #[tokio::test]
    async fn duplicate_registration_errors() {
        let registry = ToolRegistry::new();

        registry
            .register_tool(metadata(), |input: Value| async move { Ok(input) })
            .unwrap();

        let err = registry
            .register_tool(ToolMetadata::new("echo").unwrap(), |v: Value| async move {
                Ok(v)
            })
            .expect_err("duplicate registration should fail");

        assert!(matches!(err, ToolError::DuplicateTool { name } if name == "echo"));
    }

    #[tokio::test]
    async fn unknown_tool_errors() {
        let registry = ToolRegistry::new();
        let err = registry
            .invoke("missing", Value::Null)
            .await
            .expect_err("unknown tool should error");

        assert!(matches!(err, ToolError::UnknownTool { name } if name == "missing"));
    }

    #[test]
    fn invalid_metadata_errors() {
        let err = ToolMetadata::new("").expect_err("empty name should error");
        assert!(matches!(err, ToolError::InvalidMetadata { .. }));

        let err = ToolMetadata::new("has space").expect_err("space should error");
        assert!(matches!(err, ToolError::InvalidMetadata { .. }));
    }

    #[test]
    fn lists_in_registration_order() {
        let registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry
                .register_tool(ToolMetadata::new(name).unwrap(), |v: Value| async move {
                    Ok(v)
                })
                .unwrap();
        }

        let names: Vec<_> = registry
            .list()
            .iter()
            .map(|meta| meta.name().to_owned())
            .collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn descriptor_carries_input_and_description() {
        let descriptor = metadata().descriptor();
        assert_eq!(descriptor.name().as_str(), "echo");
        assert_eq!(descriptor.description(), Some("Echo incoming payload"));
        assert!(matches!(descriptor.input(), InputSpec::Parameters(records) if records.len() == 1));
    }
}

//! The capability backend seam consumed by the call bridge.

use async_trait::async_trait;
use capbridge_primitives::CapabilityDescriptor;
use serde_json::{Map, Value};

use crate::registry::{ToolRegistry, ToolResult};

/// A source of callable capabilities.
///
/// The bridge enumerates capabilities fresh before every conversation and
/// invokes them by name with already-normalized arguments.
#[async_trait]
pub trait CapabilityBackend: Send + Sync {
    /// Returns the descriptors of every capability currently offered, in a
    /// stable order.
    async fn list_capabilities(&self) -> ToolResult<Vec<CapabilityDescriptor>>;

    /// Invokes the named capability.
    async fn invoke(&self, name: &str, arguments: Map<String, Value>) -> ToolResult<Value>;
}

#[async_trait]
impl CapabilityBackend for ToolRegistry {
    async fn list_capabilities(&self) -> ToolResult<Vec<CapabilityDescriptor>> {
        Ok(self.list().iter().map(|meta| meta.descriptor()).collect())
    }

    async fn invoke(&self, name: &str, arguments: Map<String, Value>) -> ToolResult<Value> {
        ToolRegistry::invoke(self, name, Value::Object(arguments)).await
    }
}

/// Renders a capability's JSON output as the text handed back to the model.
///
/// Strings are passed through verbatim; any other value is serialized as JSON.
#[must_use]
pub fn render_output(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

// Tool trait, closure adapter and the startup-time registry

use crate::error::RegistryError;
use crate::protocol::{CallToolResult, ToolContent, ToolSchema};
use crate::schema::InputContract;
use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Tool executor trait
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool schema for the wire. Read once, at registration.
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with arguments that already passed validation
    async fn execute(&self, arguments: Value) -> Result<ToolOutput>;
}

/// What a handler produced
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Free text, presented as a `{type: "text"}` content block
    Text(String),
    /// A tool-specific value, returned as the result unchanged
    Json(Value),
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Result payload for a `tools/call` response
    pub fn into_result(self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Text(text) => serde_json::to_value(CallToolResult {
                content: vec![ToolContent::text(text)],
            }),
            Self::Json(value) => Ok(value),
        }
    }
}

/// Adapts a plain function into a [`Tool`]. The function runs on the
/// blocking pool, so it may block without stalling the session or its timeout.
pub struct FnTool<F> {
    schema: ToolSchema,
    handler: Arc<F>,
}

impl<F> FnTool<F>
where
    F: Fn(Value) -> Result<ToolOutput> + Send + Sync + 'static,
{
    pub fn new(schema: ToolSchema, handler: F) -> Self {
        Self {
            schema,
            handler: Arc::new(handler),
        }
    }
}

#[async_trait::async_trait]
impl<F> Tool for FnTool<F>
where
    F: Fn(Value) -> Result<ToolOutput> + Send + Sync + 'static,
{
    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput> {
        let handler = self.handler.clone();
        match tokio::task::spawn_blocking(move || (*handler)(arguments)).await {
            Ok(output) => output,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(anyhow::anyhow!("Tool handler was cancelled: {}", e)),
        }
    }
}

/// A registered tool: its wire schema, compiled input contract and handler
pub struct RegisteredTool {
    schema: ToolSchema,
    contract: InputContract,
    tool: Arc<dyn Tool>,
}

impl RegisteredTool {
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    pub fn contract(&self) -> &InputContract {
        &self.contract
    }

    pub fn tool(&self) -> Arc<dyn Tool> {
        self.tool.clone()
    }
}

/// Tool registry, populated at startup and read-only once handed to a server
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Fails on a duplicate name or an input schema the
    /// validator cannot compile.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let schema = tool.schema();
        if schema.name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.index.contains_key(&schema.name) {
            return Err(RegistryError::DuplicateTool(schema.name));
        }

        let contract =
            InputContract::from_schema(&schema.input_schema).map_err(|e| {
                RegistryError::InvalidSchema {
                    tool: schema.name.clone(),
                    reason: e.to_string(),
                }
            })?;

        tracing::debug!("Registered tool {}", schema.name);
        self.index.insert(schema.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            schema,
            contract,
            tool,
        });
        Ok(())
    }

    /// Register a plain function as a tool
    pub fn register_fn<F>(&mut self, schema: ToolSchema, handler: F) -> Result<(), RegistryError>
    where
        F: Fn(Value) -> Result<ToolOutput> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnTool::new(schema, handler)))
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All tools, in registration order
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTool> {
        self.tools.iter()
    }

    /// List all tool schemas, in registration order
    pub fn list_schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// Helper functions for creating tool schemas

pub fn json_schema_object(properties: Value, required: Vec<&str>) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

pub fn json_schema_string(description: &str) -> Value {
    serde_json::json!({
        "type": "string",
        "description": description
    })
}

pub fn json_schema_integer(description: &str) -> Value {
    serde_json::json!({
        "type": "integer",
        "description": description
    })
}

pub fn json_schema_boolean(description: &str) -> Value {
    serde_json::json!({
        "type": "boolean",
        "description": description
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn noop_schema(name: &str) -> ToolSchema {
        ToolSchema::new(name, "does nothing", json_schema_object(json!({}), vec![]))
    }

    fn noop(_: Value) -> Result<ToolOutput> {
        Ok(ToolOutput::text(""))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register_fn(noop_schema("a"), noop).unwrap();

        assert!(registry.contains("a"));
        assert_eq!(registry.get("a").unwrap().name(), "a");
        assert!(registry.get("b").is_none());
    }

    #[test]
    fn test_iter_exposes_registered_schemas() {
        let mut registry = ToolRegistry::new();
        registry.register_fn(noop_schema("first"), noop).unwrap();
        registry.register_fn(noop_schema("second"), noop).unwrap();

        let described: Vec<_> = registry
            .iter()
            .map(|entry| (entry.name().to_string(), entry.schema().description.clone()))
            .collect();
        assert_eq!(
            described,
            vec![
                ("first".to_string(), "does nothing".to_string()),
                ("second".to_string(), "does nothing".to_string()),
            ]
        );
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register_fn(noop_schema("a"), noop).unwrap();
        let err = registry.register_fn(noop_schema("a"), noop).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool(name) if name == "a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_list_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register_fn(noop_schema(name), noop).unwrap();
        }
        let names: Vec<_> = registry.list_schemas().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_invalid_schema_rejected_at_registration() {
        let mut registry = ToolRegistry::new();
        let schema = ToolSchema::new("bad", "bad schema", json!({"required": "x"}));
        let err = registry.register_fn(schema, noop).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidSchema { ref tool, .. } if tool == "bad"));
        assert!(registry.is_empty());

        let err = registry.register_fn(noop_schema(""), noop).unwrap_err();
        assert!(matches!(err, RegistryError::EmptyName));
    }

    #[test]
    fn test_output_into_result() {
        assert_eq!(
            ToolOutput::text("hi").into_result().unwrap(),
            json!({"content": [{"type": "text", "text": "hi"}]})
        );
        assert_eq!(
            ToolOutput::Json(json!({"temp": 21})).into_result().unwrap(),
            json!({"temp": 21})
        );
    }
}

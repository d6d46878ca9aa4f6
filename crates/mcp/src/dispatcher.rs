// tools/list and tools/call: registry lookup, argument validation and
// isolated handler execution

use crate::error::DispatchError;
use crate::protocol::{CallToolParams, ListToolsResult};
use crate::tools::{RegisteredTool, ToolOutput, ToolRegistry};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    call_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            call_timeout: None,
        }
    }

    /// Bound each handler invocation. `None` lets handlers run to completion.
    pub fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn list_tools(&self) -> ListToolsResult {
        ListToolsResult {
            tools: self.registry.list_schemas(),
        }
    }

    /// Handle a `tools/call` request's params.
    pub async fn call_tool(&self, params: Option<Value>) -> Result<Value, DispatchError> {
        let params: CallToolParams = match params {
            None | Some(Value::Null) => CallToolParams::default(),
            Some(params) => serde_json::from_value(params)
                .map_err(|e| DispatchError::InvalidParams(e.to_string()))?,
        };

        let name = params.tool().ok_or(DispatchError::MissingToolName)?;
        let entry = self
            .registry
            .get(name)
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;

        let arguments = params.arguments();
        entry.contract().validate(&arguments)?;

        tracing::info!("Executing {}", name);
        tracing::debug!("{} arguments: {}", name, arguments);
        let output = self.invoke(entry, arguments).await?;
        Ok(output.into_result()?)
    }

    /// Run the handler on its own task so a panic or hang stays contained.
    async fn invoke(
        &self,
        entry: &RegisteredTool,
        arguments: Value,
    ) -> Result<ToolOutput, DispatchError> {
        let tool = entry.tool();
        let mut handle = tokio::spawn(async move { tool.execute(arguments).await });

        let joined = match self.call_timeout {
            Some(limit) => match timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    handle.abort();
                    tracing::warn!("Tool {} timed out after {:?}", entry.name(), limit);
                    return Err(DispatchError::Timeout {
                        tool: entry.name().to_string(),
                        timeout: limit,
                    });
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => {
                let message = format!("{:#}", e);
                tracing::warn!("Tool {} failed: {}", entry.name(), message);
                Err(DispatchError::ToolFailed(message))
            }
            Err(e) if e.is_panic() => {
                tracing::error!("Tool {} panicked", entry.name());
                Err(DispatchError::Panicked(entry.name().to_string()))
            }
            Err(e) => Err(DispatchError::ToolFailed(format!(
                "Tool '{}' was cancelled: {}",
                entry.name(),
                e
            ))),
        }
    }
}

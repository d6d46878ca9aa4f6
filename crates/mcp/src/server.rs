// Protocol session: handshake/shutdown lifecycle and the request loop

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::protocol::{
    methods, InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ServerInfo, ToolsCapability, DEFAULT_PROTOCOL_VERSION,
};
use crate::tools::ToolRegistry;
use crate::transport::{self, Frame, Transport, DEFAULT_MAX_FRAME_BYTES};
use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Terminated,
}

/// Why the request loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    EndOfInput,
    Shutdown,
}

pub struct McpServer {
    dispatcher: Dispatcher,
    info: ServerInfo,
    default_protocol_version: String,
    max_frame_bytes: usize,
    state: SessionState,
}

impl McpServer {
    /// The registry is frozen from here on.
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            dispatcher: Dispatcher::new(Arc::new(registry)),
            info: ServerInfo::default(),
            default_protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            state: SessionState::Uninitialized,
        }
    }

    pub fn with_info(mut self, info: ServerInfo) -> Self {
        self.info = info;
        self
    }

    /// Version answered when the client's `initialize` names none
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.default_protocol_version = version.into();
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.dispatcher = self.dispatcher.with_call_timeout(call_timeout);
        self
    }

    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.dispatcher.registry()
    }

    /// Serve on stdin/stdout until end of input or `shutdown`.
    pub async fn start(&mut self) -> Result<ExitReason> {
        let mut transport = transport::stdio(self.max_frame_bytes);
        self.serve(&mut transport).await
    }

    /// Run the request loop on `transport`. One frame is read, handled and
    /// answered before the next is read. Only transport errors end the loop
    /// with an error.
    pub async fn serve<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<ExitReason> {
        tracing::info!(
            "{} {} ready with {} tool(s)",
            self.info.name,
            self.info.version,
            self.registry().len()
        );

        while let Some(frame) = transport.recv().await? {
            let line = match frame {
                Frame::Message(line) => line,
                Frame::Malformed(reason) => {
                    tracing::warn!("Skipping malformed frame: {:?}", reason);
                    continue;
                }
            };

            if let Some(response) = self.handle_line(&line).await {
                let encoded = serde_json::to_string(&response)?;
                tracing::debug!("send: {}", encoded);
                transport.send(encoded).await?;
            }

            if self.state == SessionState::Terminated {
                tracing::info!("Shutdown requested, stopping");
                return Ok(ExitReason::Shutdown);
            }
        }

        tracing::info!("Input closed, stopping");
        Ok(ExitReason::EndOfInput)
    }

    /// Handle one raw line. Lines that are not requests are dropped.
    pub async fn handle_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        tracing::debug!("recv: {}", line);
        match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                tracing::warn!("Skipping invalid JSON-RPC frame: {}", e);
                None
            }
        }
    }

    /// Handle a parsed request. Returns `None` for notifications.
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.method == methods::INITIALIZED {
            tracing::info!("Client initialized");
            return None;
        }

        let outcome = self.dispatch(&request.method, request.params).await;

        let Some(id) = request.id else {
            if let Err(e) = outcome {
                tracing::debug!("Notification {} failed: {}", request.method, e);
            }
            return None;
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                tracing::debug!("{} -> {} error: {}", request.method, e.kind(), e);
                JsonRpcResponse::error(id, JsonRpcError::new(e.to_string()))
            }
        })
    }

    async fn dispatch(&mut self, method: &str, params: Option<Value>) -> Result<Value, DispatchError> {
        match method {
            methods::INITIALIZE => self.initialize(params),
            methods::LIST_TOOLS => Ok(serde_json::to_value(self.dispatcher.list_tools())?),
            methods::CALL_TOOL => {
                if self.state == SessionState::Uninitialized {
                    tracing::warn!("tools/call received before initialize");
                }
                self.dispatcher.call_tool(params).await
            }
            methods::SHUTDOWN => {
                self.state = SessionState::Terminated;
                Ok(Value::Object(Default::default()))
            }
            other => Err(DispatchError::UnknownMethod(other.to_string())),
        }
    }

    /// Echo the client's version and capabilities back with our identity.
    fn initialize(&mut self, params: Option<Value>) -> Result<Value, DispatchError> {
        let params: InitializeParams = match params {
            None | Some(Value::Null) => InitializeParams::default(),
            Some(params) => serde_json::from_value(params)
                .map_err(|e| DispatchError::InvalidParams(e.to_string()))?,
        };

        if let Some(client) = &params.client_info {
            tracing::info!(
                "Initializing session for {} {}",
                client.name,
                client.version.as_deref().unwrap_or("")
            );
        }

        let mut capabilities = params
            .capabilities
            .unwrap_or_else(|| Value::Object(Default::default()));
        if let Value::Object(caps) = &mut capabilities {
            if !caps.contains_key("tools") {
                caps.insert(
                    "tools".to_string(),
                    serde_json::to_value(ToolsCapability {
                        list_changed: false,
                    })?,
                );
            }
        }

        let result = InitializeResult {
            protocol_version: params
                .protocol_version
                .unwrap_or_else(|| self.default_protocol_version.clone()),
            capabilities,
            server_info: self.info.clone(),
        };

        self.state = SessionState::Ready;
        Ok(serde_json::to_value(result)?)
    }
}

// Echo tool, mostly useful for checking a client's wiring

use crate::protocol::ToolSchema;
use crate::tools::{json_schema_object, json_schema_string, Tool, ToolOutput};
use anyhow::{Context, Result};
use serde::Deserialize;

pub struct EchoTool;

#[derive(Debug, Deserialize)]
struct EchoArgs {
    text: String,
}

#[async_trait::async_trait]
impl Tool for EchoTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "echo",
            "Return the given text unchanged",
            json_schema_object(
                serde_json::json!({
                    "text": json_schema_string("Text to echo back")
                }),
                vec!["text"],
            ),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput> {
        let args: EchoArgs =
            serde_json::from_value(arguments).context("Invalid arguments for echo")?;
        Ok(ToolOutput::Text(args.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_returns_text() {
        let output = EchoTool
            .execute(serde_json::json!({"text": "hi"}))
            .await
            .unwrap();
        assert_eq!(output, ToolOutput::text("hi"));
    }
}

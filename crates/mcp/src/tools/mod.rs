pub mod echo;
pub mod files;
mod registry;

pub use echo::EchoTool;
pub use files::{FileRoot, ListFilesTool, ReadFileTool};
pub use registry::{
    json_schema_boolean, json_schema_integer, json_schema_object, json_schema_string, FnTool,
    RegisteredTool, Tool, ToolOutput, ToolRegistry,
};

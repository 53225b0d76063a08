//! 工具箱：Tool 契约、注册表、执行器、健康记账与参数 Schema

pub mod echo;
pub mod executor;
pub mod health;
pub mod registry;
pub mod schema;

pub use echo::EchoTool;
pub use executor::{
    AllowAll, ConfigPermissions, PermissionGate, ToolCall, ToolExecutor, ToolResult,
};
pub use health::{HealthTable, ToolHealth};
pub use registry::{RiskLevel, Tool, ToolCategory, ToolRegistry};
pub use schema::{tool_call_schema_json, ParamKind, ParamSpec, ToolSchema};

//! Agent 错误类型
//!
//! 工具校验 / 执行 / 权限 / 超时 / 熔断禁用等错误在 ToolExecutor 边界统一转为
//! ToolResult::Failure（携带 ErrorCode），绝不向上层抛出，避免单次工具失败中断整轮对话。

use serde::Serialize;
use thiserror::Error;

/// Agent 运行过程中可能出现的错误（参数、权限、网络、执行、超时、禁用）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 访问越出允许路径（由具体文件类工具抛出）
    #[error("Path violation: {0}")]
    PathViolation(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// 超时是一等失败类型：调用方与熔断逻辑需区分「工具慢」与「工具坏」
    #[error("Tool '{tool}' timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    /// 工具因连续失败被自动禁用
    #[error("Tool '{0}' is disabled")]
    Disabled(String),
}

/// 错误分类码：ToolResult::Failure 携带，可序列化供前端/日志使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    MissingParameter,
    InvalidParameter,
    Unauthorized,
    PathViolation,
    NetworkError,
    ExecutionFailed,
    Timeout,
    Disabled,
}

impl AgentError {
    /// 映射到分类码
    pub fn code(&self) -> ErrorCode {
        match self {
            AgentError::MissingParameter(_) => ErrorCode::MissingParameter,
            AgentError::InvalidParameter(_) => ErrorCode::InvalidParameter,
            AgentError::Unauthorized(_) => ErrorCode::Unauthorized,
            AgentError::PathViolation(_) => ErrorCode::PathViolation,
            AgentError::NetworkError(_) => ErrorCode::NetworkError,
            AgentError::ExecutionFailed(_) => ErrorCode::ExecutionFailed,
            AgentError::Timeout { .. } => ErrorCode::Timeout,
            AgentError::Disabled(_) => ErrorCode::Disabled,
        }
    }
}

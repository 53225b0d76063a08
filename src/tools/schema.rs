//! 工具参数 Schema：具名参数（类型 / 必填 / 枚举）与默认校验
//!
//! 另含 schemars 生成的「合法 tool call」JSON Schema，可拼入 system prompt
//! 减少 LLM 输出格式错误。

use std::collections::HashMap;

use schemars::{schema_for, JsonSchema};
use serde::Serialize;

use crate::core::AgentError;

/// 参数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Integer,
    Float,
    Boolean,
}

/// 单个具名参数的描述
#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    /// 可选枚举：取值必须落在其中
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            allowed: None,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }

    pub fn with_allowed(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }
}

/// 工具参数 Schema：参数列表 + 默认校验逻辑
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolSchema {
    pub params: Vec<ParamSpec>,
}

impl ToolSchema {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self { params }
    }

    /// 默认校验：必填缺失 -> MissingParameter；类型 / 枚举不符 -> InvalidParameter。
    /// 未在 Schema 中声明的多余参数不报错（对 LLM 生成的参数保持宽容）。
    pub fn validate(&self, args: &HashMap<String, String>) -> Result<(), AgentError> {
        for spec in &self.params {
            let value = match args.get(&spec.name) {
                Some(v) => v,
                None if spec.required => {
                    return Err(AgentError::MissingParameter(spec.name.clone()))
                }
                None => continue,
            };

            match spec.kind {
                ParamKind::String => {}
                ParamKind::Integer => {
                    if value.parse::<i64>().is_err() {
                        return Err(AgentError::InvalidParameter(format!(
                            "{}: expected integer, got '{}'",
                            spec.name, value
                        )));
                    }
                }
                ParamKind::Float => {
                    if value.parse::<f64>().is_err() {
                        return Err(AgentError::InvalidParameter(format!(
                            "{}: expected number, got '{}'",
                            spec.name, value
                        )));
                    }
                }
                ParamKind::Boolean => {
                    if value.parse::<bool>().is_err() {
                        return Err(AgentError::InvalidParameter(format!(
                            "{}: expected true/false, got '{}'",
                            spec.name, value
                        )));
                    }
                }
            }

            if let Some(allowed) = &spec.allowed {
                if !allowed.iter().any(|a| a == value) {
                    return Err(AgentError::InvalidParameter(format!(
                        "{}: '{}' not in [{}]",
                        spec.name,
                        value,
                        allowed.join(", ")
                    )));
                }
            }
        }
        Ok(())
    }
}

/// 工具调用请求格式：`{"tool": "...", "args": {...}}`（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallFormat {
    /// 工具名，如 echo、call_subordinate、delegate_parallel
    pub tool: String,
    /// 工具参数，依工具不同而不同（message、profile、tasks 等）
    pub args: HashMap<String, String>,
}

/// 返回工具调用的 JSON Schema 字符串，可拼入 system prompt
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(ToolCallFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| String::new())
}

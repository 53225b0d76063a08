//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / risk_level / schema / validate / execute），
//! 由 ToolRegistry 按名注册与查找，ToolExecutor 在调用时加超时、权限门与熔断记账。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::core::AgentError;
use crate::tools::schema::ToolSchema;

/// 风险等级（有序）：High 及以上的工具执行前需通过权限门
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// 工具类别：决定超时策略；Delegation 类自带内部截止时间，豁免外层超时
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCategory {
    Standard,
    Io,
    Network,
    Delegation,
}

/// 工具 trait：名称、描述（供 LLM 理解）、风险等级、参数 Schema、校验与异步执行。
/// 参数统一为 `HashMap<String, String>`（LLM 产出的扁平键值对）。
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（注册表中的唯一键）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Standard
    }

    /// 参数 Schema（供校验与 prompt 生成）
    fn schema(&self) -> ToolSchema {
        ToolSchema::default()
    }

    /// 参数校验：默认按 Schema 做必填 / 类型 / 枚举检查；工具可覆盖加自定义规则
    fn validate(&self, args: &HashMap<String, String>) -> Result<(), AgentError> {
        self.schema().validate(args)
    }

    /// 执行工具
    async fn execute(&self, args: &HashMap<String, String>) -> Result<String, AgentError>;
}

/// 工具注册表：按名称存储 Arc<dyn Tool>
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具；同名重复注册为替换
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// 已注册工具名（排序后返回，兼作「未知工具」报错里的可发现性清单）
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// 返回 (name, description) 列表，用于生成 prompt 中的 Available tools 段落
    pub fn tool_descriptions(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .tools
            .iter()
            .map(|(name, tool)| (name.clone(), tool.description().to_string()))
            .collect();
        out.sort();
        out
    }

    /// 动态生成工具 Schema JSON（与实际注册的工具一致）
    pub fn to_schema_json(&self) -> String {
        let tools: Vec<serde_json::Value> = self
            .tool_names()
            .iter()
            .filter_map(|name| self.tools.get(name).map(|t| (name, t)))
            .map(|(name, tool)| {
                serde_json::json!({
                    "name": name,
                    "description": tool.description(),
                    "risk_level": tool.risk_level(),
                    "parameters": tool.schema(),
                })
            })
            .collect();
        serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string())
    }
}

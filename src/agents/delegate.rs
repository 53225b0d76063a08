//! 委派工具：call_subordinate（单任务）与 delegate_parallel（并行批次）
//!
//! 两者都是 Delegation 类（豁免执行器外层超时，依赖编排器内部截止时间），
//! 并位于保护名单（委派是 agent 应答能力的根基，不得被熔断下线）。
//! 工具实例在构造时绑定父运行 id，子运行的步骤经 StepRelay 回流父流。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::agents::orchestrator::SubAgentOrchestrator;
use crate::agents::parser::parse_task_batch;
use crate::core::AgentError;
use crate::tools::schema::{ParamKind, ParamSpec, ToolSchema};
use crate::tools::{RiskLevel, Tool, ToolCategory};

/// 单任务委派工具
pub struct CallSubordinateTool {
    orchestrator: Arc<SubAgentOrchestrator>,
    parent_id: Option<String>,
}

impl CallSubordinateTool {
    pub fn new(orchestrator: Arc<SubAgentOrchestrator>, parent_id: Option<String>) -> Self {
        Self {
            orchestrator,
            parent_id,
        }
    }
}

#[async_trait]
impl Tool for CallSubordinateTool {
    fn name(&self) -> &str {
        "call_subordinate"
    }

    fn description(&self) -> &str {
        "Delegate a task to a fresh sub-agent. Args: {\"profile\": \"coder|researcher|reviewer|writer|general\", \"message\": \"task description\"}"
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Delegation
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![
            ParamSpec::optional("profile", ParamKind::String, "requested sub-agent role"),
            ParamSpec::required("message", ParamKind::String, "task for the sub-agent"),
        ])
    }

    async fn execute(&self, args: &HashMap<String, String>) -> Result<String, AgentError> {
        let profile = args.get("profile").map(String::as_str).unwrap_or("general");
        let message = args
            .get("message")
            .ok_or_else(|| AgentError::MissingParameter("message".into()))?;
        Ok(self
            .orchestrator
            .delegate(profile, message, self.parent_id.as_deref())
            .await)
    }
}

/// 并行批次委派工具
pub struct DelegateParallelTool {
    orchestrator: Arc<SubAgentOrchestrator>,
    parent_id: Option<String>,
}

impl DelegateParallelTool {
    pub fn new(orchestrator: Arc<SubAgentOrchestrator>, parent_id: Option<String>) -> Self {
        Self {
            orchestrator,
            parent_id,
        }
    }
}

#[async_trait]
impl Tool for DelegateParallelTool {
    fn name(&self) -> &str {
        "delegate_parallel"
    }

    fn description(&self) -> &str {
        "Run several sub-agent tasks concurrently. Args: {\"tasks\": \"JSON array of {profile, message}\"}"
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Delegation
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![ParamSpec::required(
            "tasks",
            ParamKind::String,
            "JSON array of {profile, message} objects",
        )])
    }

    /// Schema 检查之外预解析批次：坏载荷在校验阶段即失败并计入熔断记账
    fn validate(&self, args: &HashMap<String, String>) -> Result<(), AgentError> {
        self.schema().validate(args)?;
        let payload = args
            .get("tasks")
            .ok_or_else(|| AgentError::MissingParameter("tasks".into()))?;
        parse_task_batch(payload).map(|_| ())
    }

    async fn execute(&self, args: &HashMap<String, String>) -> Result<String, AgentError> {
        let payload = args
            .get("tasks")
            .ok_or_else(|| AgentError::MissingParameter("tasks".into()))?;
        Ok(self
            .orchestrator
            .delegate_parallel(payload, self.parent_id.as_deref())
            .await)
    }
}

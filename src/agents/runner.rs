//! 子代理运行接口：宿主运行时实现的外部缝
//!
//! 编排器通过 AgentRunner::start_run 启动子代理并拿到它的步骤流；
//! 每次委派都构造全新的运行（绝不复用，避免无关任务间的状态串漏），
//! 运行随流结束或所属编排取消而销毁。

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::agents::events::StepEvent;
use crate::agents::profile::AgentRole;
use crate::core::AgentError;

/// LLM 供应方配置（透传给宿主运行时）
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub provider: String,
    pub model: String,
}

/// 父代理长期记忆的快照，用于播种子代理
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshot {
    pub entries: Vec<String>,
}

/// 一次子代理运行：id、角色、步骤流与取消令牌。
/// 编排器超时 / 被取消时触发 cancel，宿主据此终止底层任务。
pub struct SubAgentRun {
    pub id: Uuid,
    pub role: AgentRole,
    pub steps: mpsc::UnboundedReceiver<StepEvent>,
    pub cancel: CancellationToken,
}

impl SubAgentRun {
    pub fn new(role: AgentRole, steps: mpsc::UnboundedReceiver<StepEvent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            steps,
            cancel: CancellationToken::new(),
        }
    }
}

/// 子代理启动缝：宿主运行时实现（真实 LLM 循环 / 测试脚本）
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// 以流式模式启动一个全新的子代理运行
    async fn start_run(
        &self,
        message: &str,
        role: AgentRole,
        provider: &ProviderConfig,
        inherited_memory: Option<MemorySnapshot>,
    ) -> Result<SubAgentRun, AgentError>;
}

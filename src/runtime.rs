//! 运行时组件装配
//!
//! 供宿主前端调用的无界面装配逻辑：create_components 按配置构建槽位池、转发注册表、
//! 挂起操作表与编排器，并返回预注册好 echo 与委派工具的执行器；各组件可多会话共享。

use std::sync::Arc;

use crate::agents::{
    AgentRunner, CallSubordinateTool, DelegateParallelTool, ProviderConfig, StepRelay,
    SubAgentOrchestrator,
};
use crate::config::AppConfig;
use crate::core::{ConcurrencySlotPool, PendingOperationTable};
use crate::tools::{ConfigPermissions, EchoTool, ToolExecutor};

/// 预构建的运行时组件：执行器、编排器、挂起表、转发表、槽位池
pub struct Components {
    pub executor: Arc<ToolExecutor>,
    pub orchestrator: Arc<SubAgentOrchestrator>,
    pub pending: Arc<PendingOperationTable>,
    pub relay: Arc<StepRelay>,
    pub slots: Arc<ConcurrencySlotPool>,
}

/// 创建运行时组件。parent_id 为本会话的运行身份：
/// 委派工具据此把子代理步骤转发回本会话的输出流。
pub async fn create_components(
    cfg: &AppConfig,
    runner: Arc<dyn AgentRunner>,
    provider: ProviderConfig,
    parent_id: Option<String>,
) -> anyhow::Result<Components> {
    let slots = Arc::new(ConcurrencySlotPool::new(
        cfg.subagents.effective_capacity(),
    ));
    let relay = Arc::new(StepRelay::new(std::time::Duration::from_secs(
        cfg.subagents.relay_ttl_secs,
    )));
    let pending = Arc::new(PendingOperationTable::new());

    let orchestrator = Arc::new(SubAgentOrchestrator::new(
        runner,
        Arc::clone(&slots),
        Arc::clone(&relay),
        cfg.subagents.clone(),
        provider,
    ));

    let permissions = Arc::new(ConfigPermissions::new(cfg.permissions.flags.clone()));
    let executor = Arc::new(ToolExecutor::new(&cfg.tools, permissions));

    executor.register(EchoTool).await;
    executor
        .register(CallSubordinateTool::new(
            Arc::clone(&orchestrator),
            parent_id.clone(),
        ))
        .await;
    executor
        .register(DelegateParallelTool::new(
            Arc::clone(&orchestrator),
            parent_id,
        ))
        .await;

    let tools = executor.tool_names().await;
    tracing::info!(capacity = slots.capacity(), ?tools, "runtime components ready");

    Ok(Components {
        executor,
        orchestrator,
        pending,
        relay,
        slots,
    })
}

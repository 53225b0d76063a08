//! 委派编排集成测试

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use swarm::agents::{
    AgentRole, AgentRunner, MemorySnapshot, ProviderConfig, StepEvent, StepKind, StepRelay,
    SubAgentOrchestrator, SubAgentRun,
};
use swarm::config::{AppConfig, SubAgentsSection};
use swarm::core::{AgentError, ConcurrencySlotPool};
use swarm::tools::ToolCall;

/// 脚本化子代理：think -> (可选延迟 / 悬挂) -> tool_result -> final_answer。
/// 消息以 "sleep:<ms> " 开头时先延迟；以 "hang" 开头时只发 think 然后悬挂直到被取消。
struct ScriptedRunner {
    started: AtomicUsize,
}

impl ScriptedRunner {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            started: AtomicUsize::new(0),
        })
    }

    fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentRunner for ScriptedRunner {
    async fn start_run(
        &self,
        message: &str,
        role: AgentRole,
        _provider: &ProviderConfig,
        _inherited_memory: Option<MemorySnapshot>,
    ) -> Result<SubAgentRun, AgentError> {
        self.started.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::unbounded_channel();
        let run = SubAgentRun::new(role, rx);
        let cancel = run.cancel.clone();
        let message = message.to_string();

        tokio::spawn(async move {
            let _ = tx.send(StepEvent::think(1, format!("working on {}", message), "child"));

            if message.starts_with("hang") {
                cancel.cancelled().await;
                return;
            }
            if let Some(rest) = message.strip_prefix("sleep:") {
                let ms: u64 = rest
                    .split_whitespace()
                    .next()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(Duration::from_millis(ms)) => {}
                }
            }

            let _ = tx.send(StepEvent::tool_result(2, "echo", "ok", true, "child"));
            let _ = tx.send(StepEvent::final_answer(3, format!("done: {}", message), "child"));
        });

        Ok(run)
    }
}

fn settings(capacity: usize, run_timeout: u64, global_timeout: u64) -> SubAgentsSection {
    SubAgentsSection {
        capacity: Some(capacity),
        run_timeout_secs: run_timeout,
        global_timeout_secs: global_timeout,
        ..SubAgentsSection::default()
    }
}

fn orchestrator(
    runner: Arc<ScriptedRunner>,
    settings: SubAgentsSection,
) -> (Arc<SubAgentOrchestrator>, Arc<ConcurrencySlotPool>, Arc<StepRelay>) {
    let slots = Arc::new(ConcurrencySlotPool::new(settings.effective_capacity()));
    let relay = Arc::new(StepRelay::new(Duration::from_secs(
        settings.relay_ttl_secs,
    )));
    let orch = Arc::new(SubAgentOrchestrator::new(
        runner,
        Arc::clone(&slots),
        Arc::clone(&relay),
        settings,
        ProviderConfig::default(),
    ));
    (orch, slots, relay)
}

#[tokio::test]
async fn test_single_delegation_reports_final_answer() {
    let runner = ScriptedRunner::new();
    let (orch, _, _) = orchestrator(Arc::clone(&runner), settings(2, 600, 600));

    let report = orch.delegate("coder", "build it", None).await;
    assert!(report.contains("### Sub-agent report (coder)"));
    assert!(report.contains("done: build it"));
    assert!(report.contains("Status: 3 steps, success=true"));
    assert_eq!(runner.started(), 1);
}

#[tokio::test]
async fn test_every_delegation_gets_a_fresh_run() {
    let runner = ScriptedRunner::new();
    let (orch, slots, _) = orchestrator(Arc::clone(&runner), settings(2, 600, 600));

    let _ = orch.delegate("coder", "a", None).await;
    let _ = orch.delegate("coder", "b", None).await;
    assert_eq!(runner.started(), 2);
    // 槽位全数归还
    assert_eq!(slots.active(), 0);
}

#[tokio::test]
async fn test_capacity_exceeded_fails_fast_with_limit() {
    let runner = ScriptedRunner::new();
    let (orch, slots, _) = orchestrator(Arc::clone(&runner), settings(1, 600, 600));

    let permit = slots.try_acquire().unwrap();
    let report = orch.delegate("coder", "blocked", None).await;
    assert!(report.contains("1 of 1 slots"));
    // 满员时不应启动任何运行
    assert_eq!(runner.started(), 0);
    drop(permit);
}

#[tokio::test(start_paused = true)]
async fn test_run_timeout_returns_partial_aggregate() {
    let runner = ScriptedRunner::new();
    let (orch, slots, _) = orchestrator(Arc::clone(&runner), settings(2, 1, 600));

    let report = orch.delegate("researcher", "hang forever", None).await;
    assert!(report.contains("success=false"));
    assert!(report.contains("timed out after 1s"));
    // think 一步已折叠进部分聚合
    assert!(report.contains("Status: 1 steps"));
    assert_eq!(slots.active(), 0);
}

#[tokio::test]
async fn test_parallel_results_in_submission_order() {
    let runner = ScriptedRunner::new();
    let (orch, _, _) = orchestrator(Arc::clone(&runner), settings(2, 600, 600));

    // 任务 0 比任务 1 慢：完成顺序与提交顺序相反
    let payload = r#"[{"profile": "coder", "message": "sleep:200 first"},
                      {"profile": "writer", "message": "second"}]"#;
    let out = orch.delegate_parallel(payload, None).await;

    let pos0 = out.find("(coder[0])").expect("coder[0] section missing");
    let pos1 = out.find("(writer[1])").expect("writer[1] section missing");
    assert!(pos0 < pos1, "results must be collated in submission order");
    assert!(out.contains("done: sleep:200 first"));
    assert!(out.contains("done: second"));
    assert_eq!(runner.started(), 2);
}

#[tokio::test]
async fn test_parallel_batch_truncated_to_capacity() {
    let runner = ScriptedRunner::new();
    let (orch, _, _) = orchestrator(Arc::clone(&runner), settings(2, 600, 600));

    let payload = r#"[{"message": "a"}, {"message": "b"}, {"message": "c"}, {"message": "d"}]"#;
    let out = orch.delegate_parallel(payload, None).await;

    assert!(out.contains("2 task(s) (2 dropped over capacity)"));
    assert_eq!(runner.started(), 2);
    assert!(out.contains("(general[0])"));
    assert!(out.contains("(general[1])"));
    assert!(!out.contains("[2]"));
}

#[tokio::test(start_paused = true)]
async fn test_parallel_batch_timeout_keeps_completed_results() {
    let runner = ScriptedRunner::new();
    let (orch, slots, _) = orchestrator(Arc::clone(&runner), settings(2, 600, 1));

    let payload = r#"[{"profile": "coder", "message": "quick"},
                      {"profile": "writer", "message": "hang forever"}]"#;
    let out = orch.delegate_parallel(payload, None).await;

    // 已完成的结果保留，未完成的合成超时条目，顺序不变
    assert!(out.contains("done: quick"));
    assert!(out.contains("(writer[1])"));
    assert!(out.contains("batch deadline of 1s expired"));
    // 被掐掉的任务不得泄漏槽位
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(slots.active(), 0);
}

#[tokio::test]
async fn test_malformed_batch_rejected_only_when_unrecoverable() {
    let runner = ScriptedRunner::new();
    let (orch, _, _) = orchestrator(Arc::clone(&runner), settings(2, 600, 600));

    // 裸对象列表可恢复
    let out = orch
        .delegate_parallel(r#"{"message": "a"}, {"message": "b"}"#, None)
        .await;
    assert!(out.contains("2 task(s)"));

    // 完全无法恢复才拒绝
    let out = orch.delegate_parallel("not json at all", None).await;
    assert!(out.contains("Parallel delegation rejected"));
}

#[tokio::test(start_paused = true)]
async fn test_relay_forwards_terminal_events_and_throttles_spam() {
    let runner = ScriptedRunner::new();
    let (orch, _, relay) = orchestrator(Arc::clone(&runner), settings(2, 600, 600));

    let (tx, mut rx) = mpsc::unbounded_channel();
    relay.register("parent-1", tx);

    let _ = orch.delegate("coder", "task", Some("parent-1")).await;

    let mut kinds = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        assert_eq!(ev.origin, "coder");
        kinds.push(ev.kind);
    }
    // 首个事件与终结事件必达；紧随其后的 tool_result 落在节流窗口内被抑制
    assert_eq!(kinds.first(), Some(&StepKind::Think));
    assert_eq!(kinds.last(), Some(&StepKind::FinalAnswer));
    assert!(!kinds.contains(&StepKind::ToolResult));
}

#[tokio::test]
async fn test_components_roundtrip_through_executor() {
    let runner = ScriptedRunner::new();
    let cfg = AppConfig::default();
    let components = swarm::create_components(
        &cfg,
        runner,
        ProviderConfig::default(),
        Some("parent-1".to_string()),
    )
    .await
    .unwrap();

    let mut args = HashMap::new();
    args.insert("profile".to_string(), "reviewer".to_string());
    args.insert("message".to_string(), "check the diff".to_string());

    let result = components
        .executor
        .execute(&ToolCall::new("call_subordinate", args), None)
        .await;
    assert!(result.is_success());
    assert!(result.text().contains("done: check the diff"));
    assert!(result.text().contains("(reviewer)"));
}

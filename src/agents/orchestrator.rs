//! 子代理编排器：把委派请求变成一个或一批隔离的子代理运行
//!
//! 单次委派：档位映射 -> 占槽（满员快速失败）-> 全新运行 -> 在全局超时内消费步骤流，
//! 事件一边节流转发给父流（终结事件不节流），一边折叠进聚合结果；超时返回部分聚合
//! 而非上抛——子代理超时不该炸掉父代理的回合。槽位凭据 RAII，任何退出路径都归还。
//!
//! 并行委派：宽容解析批次 -> 截断到池容量 -> 每任务一个并发运行（标签 profile[n]）->
//! 共享截止时间等待全部；超时保留已完成的结果并为未完成者合成超时条目，
//! 结果按提交顺序拼装，与完成顺序无关。

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::timeout;

use crate::agents::events::{StepEvent, StepKind};
use crate::agents::parser::parse_task_batch;
use crate::agents::profile::{resolve_profile, AgentRole};
use crate::agents::relay::StepRelay;
use crate::agents::runner::{AgentRunner, MemorySnapshot, ProviderConfig, SubAgentRun};
use crate::config::SubAgentsSection;
use crate::core::ConcurrencySlotPool;

/// 聚合轨迹保留的压缩行数上限
const MAX_TRACE_LINES: usize = 12;

/// 父记忆快照提供方：单次委派时播种子代理
pub trait MemoryInherit: Send + Sync {
    fn snapshot(&self) -> MemorySnapshot;
}

/// 一次运行折叠出的聚合结果
#[derive(Debug, Default)]
pub struct RunAggregate {
    pub steps: u64,
    pub success: bool,
    pub final_answer: Option<String>,
    pub trace: Vec<String>,
    pub timed_out_after: Option<u64>,
}

impl RunAggregate {
    fn new() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// 折叠一个事件：失败的工具结果或错误事件翻转 success
    fn fold(&mut self, ev: &StepEvent) {
        self.steps += 1;
        match ev.kind {
            StepKind::Think => self.push_trace(format!("think: {}", condense(&ev.content))),
            StepKind::ToolCall => self.push_trace(format!(
                "call {}: {}",
                ev.tool_name.as_deref().unwrap_or("?"),
                condense(&ev.content)
            )),
            StepKind::ToolResult => {
                let ok = ev.success.unwrap_or(true);
                if !ok {
                    self.success = false;
                }
                self.push_trace(format!(
                    "{} -> {}: {}",
                    ev.tool_name.as_deref().unwrap_or("?"),
                    if ok { "ok" } else { "err" },
                    condense(&ev.content)
                ));
            }
            StepKind::FinalAnswer => self.final_answer = Some(ev.content.clone()),
            StepKind::Error => {
                self.success = false;
                self.push_trace(format!("error: {}", condense(&ev.content)));
            }
        }
    }

    fn push_trace(&mut self, line: String) {
        if self.trace.len() >= MAX_TRACE_LINES {
            self.trace.remove(0);
        }
        self.trace.push(line);
    }
}

fn condense(s: &str) -> String {
    let line = s.lines().next().unwrap_or("");
    if line.chars().count() > 100 {
        format!("{}...", line.chars().take(100).collect::<String>())
    } else {
        line.to_string()
    }
}

/// 子代理编排器
pub struct SubAgentOrchestrator {
    runner: Arc<dyn AgentRunner>,
    slots: Arc<ConcurrencySlotPool>,
    relay: Arc<StepRelay>,
    settings: SubAgentsSection,
    provider: ProviderConfig,
    memory: Option<Arc<dyn MemoryInherit>>,
}

impl SubAgentOrchestrator {
    pub fn new(
        runner: Arc<dyn AgentRunner>,
        slots: Arc<ConcurrencySlotPool>,
        relay: Arc<StepRelay>,
        settings: SubAgentsSection,
        provider: ProviderConfig,
    ) -> Self {
        Self {
            runner,
            slots,
            relay,
            settings,
            provider,
            memory: None,
        }
    }

    /// 配置父记忆播种
    pub fn with_memory(mut self, memory: Arc<dyn MemoryInherit>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn slots(&self) -> &Arc<ConcurrencySlotPool> {
        &self.slots
    }

    /// 单次委派：返回结构化文本报告（角色、最终回答、压缩轨迹、状态行）
    pub async fn delegate(&self, profile: &str, message: &str, parent_id: Option<&str>) -> String {
        let role = resolve_profile(profile);
        let memory = self.memory.as_ref().map(|m| m.snapshot());
        self.delegate_labeled(role, message, parent_id, role.as_str(), memory)
            .await
    }

    async fn delegate_labeled(
        &self,
        role: AgentRole,
        message: &str,
        parent_id: Option<&str>,
        label: &str,
        memory: Option<MemorySnapshot>,
    ) -> String {
        // 占槽失败快速返回确定性消息（报出容量，调用方可稍后重试）
        let _permit = match self.slots.try_acquire() {
            Some(p) => p,
            None => {
                return format!(
                    "Too many sub-agents running ({} of {} slots in use); retry later.",
                    self.slots.active(),
                    self.slots.capacity()
                )
            }
        };

        // 每次委派都是全新运行，杜绝无关任务间的状态串漏
        let run = match self
            .runner
            .start_run(message, role, &self.provider, memory)
            .await
        {
            Ok(run) => run,
            Err(e) => return format!("Sub-agent '{}' failed to start: {}", label, e),
        };

        tracing::info!(run_id = %run.id, label, "sub-agent run started");
        let agg = self
            .consume_run(run, label, parent_id, Duration::from_secs(self.settings.run_timeout_secs))
            .await;
        format_report(label, &agg)
    }

    /// 消费一个运行的步骤流：与截止时间竞速，事件节流转发 + 折叠聚合。
    /// 守卫保证无论正常结束、超时还是本任务被 abort，子运行都会收到取消信号。
    async fn consume_run(
        &self,
        mut run: SubAgentRun,
        label: &str,
        parent_id: Option<&str>,
        deadline: Duration,
    ) -> RunAggregate {
        let _cancel_guard = run.cancel.clone().drop_guard();
        let relay_interval = Duration::from_millis(self.settings.relay_interval_ms);
        let mut last_relay: Option<tokio::time::Instant> = None;
        let mut agg = RunAggregate::new();

        let expired = tokio::time::sleep(deadline);
        tokio::pin!(expired);

        loop {
            tokio::select! {
                _ = &mut expired => {
                    agg.success = false;
                    agg.timed_out_after = Some(deadline.as_secs());
                    tracing::warn!(label, secs = deadline.as_secs(), "sub-agent run timed out; returning partial aggregate");
                    break;
                }
                ev = run.steps.recv() => match ev {
                    Some(ev) => {
                        let ev = ev.with_origin(label);
                        if let Some(pid) = parent_id {
                            let now = tokio::time::Instant::now();
                            // 节流：终结事件必达，其余至多每 relay_interval 一条
                            let due = ev.is_terminal()
                                || last_relay.map_or(true, |t| now - t >= relay_interval);
                            if due {
                                self.relay.forward(pid, ev.clone());
                                last_relay = Some(now);
                            }
                        }
                        agg.fold(&ev);
                    }
                    None => break,
                }
            }
        }

        agg
    }

    /// 并行委派：payload 为 {profile, message} 批次（宽容解析）
    pub async fn delegate_parallel(self: &Arc<Self>, payload: &str, parent_id: Option<&str>) -> String {
        let mut tasks = match parse_task_batch(payload) {
            Ok(t) => t,
            Err(e) => return format!("Parallel delegation rejected: {}", e),
        };

        // 截断到池容量：多余任务丢弃而非排队
        let cap = self.settings.effective_batch_cap().min(self.slots.capacity());
        let dropped = tasks.len().saturating_sub(cap);
        if dropped > 0 {
            tracing::warn!(dropped, cap, "delegation batch truncated to pool capacity");
            tasks.truncate(cap);
        }

        let n = tasks.len();
        let results: Arc<tokio::sync::Mutex<Vec<Option<String>>>> =
            Arc::new(tokio::sync::Mutex::new(vec![None; n]));

        let mut handles = Vec::with_capacity(n);
        for (i, task) in tasks.iter().cloned().enumerate() {
            let orch = Arc::clone(self);
            let results = Arc::clone(&results);
            let parent = parent_id.map(str::to_string);
            // 索引限定标签，父流中并发轨迹可区分
            let label = format!("{}[{}]", task.profile, i);
            handles.push(tokio::spawn(async move {
                let role = resolve_profile(&task.profile);
                let report = orch
                    .delegate_labeled(role, &task.message, parent.as_deref(), &label, None)
                    .await;
                results.lock().await[i] = Some(report);
            }));
        }

        // 一个共享的全局截止时间罩住整批
        let global = Duration::from_secs(self.settings.global_timeout_secs);
        let batch_timed_out = timeout(global, join_all(handles.iter_mut()))
            .await
            .is_err();
        if batch_timed_out {
            // 掐掉掉队者；其槽位凭据与取消守卫随 future 丢弃而释放
            for h in &handles {
                h.abort();
            }
            tracing::warn!(secs = global.as_secs(), "parallel batch deadline expired; keeping completed results");
        }

        // 按提交顺序拼装，未完成者用合成超时条目占位
        let results = results.lock().await;
        let mut sections = Vec::with_capacity(n);
        for (i, task) in tasks.iter().enumerate() {
            match &results[i] {
                Some(report) => sections.push(report.clone()),
                None => sections.push(format!(
                    "### Sub-agent report ({}[{}])\n\n(no result: batch deadline of {}s expired before completion)\n\nStatus: 0 steps, success=false",
                    task.profile,
                    i,
                    global.as_secs()
                )),
            }
        }

        let mut out = format!("## Parallel delegation: {} task(s)", n);
        if dropped > 0 {
            out.push_str(&format!(" ({} dropped over capacity)", dropped));
        }
        out.push_str("\n\n");
        out.push_str(&sections.join("\n\n---\n\n"));
        out
    }
}

/// 汇报格式：角色标签、最终回答、压缩轨迹、带步数的状态行
fn format_report(label: &str, agg: &RunAggregate) -> String {
    let mut out = format!("### Sub-agent report ({})\n\n", label);
    out.push_str(agg.final_answer.as_deref().unwrap_or("(no final answer)"));
    out.push('\n');

    if !agg.trace.is_empty() {
        out.push_str("\nTrace:\n");
        for line in &agg.trace {
            out.push_str("- ");
            out.push_str(line);
            out.push('\n');
        }
    }

    out.push_str(&format!(
        "\nStatus: {} steps, success={}",
        agg.steps, agg.success
    ));
    if let Some(secs) = agg.timed_out_after {
        out.push_str(&format!(", timed out after {}s", secs));
    }
    out
}

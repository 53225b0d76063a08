//! 工具执行器：所有工具调用的唯一入口
//!
//! 调度顺序：禁用检查 -> 查找 -> 权限门（高危工具）-> 参数校验 -> 超时竞速执行 -> 健康记账。
//! 所有错误在此边界转为 ToolResult::Failure，绝不上抛；每次调用输出结构化审计日志（JSON）。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;

use crate::config::{CategoryTimeoutsSection, ToolsSection};
use crate::core::{AgentError, ErrorCode};
use crate::tools::health::{HealthTable, ToolHealth};
use crate::tools::registry::{RiskLevel, Tool, ToolCategory, ToolRegistry};

/// 一次工具调用请求；创建后不可变，call_id 仅用于链路追踪
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub name: String,
    pub arguments: HashMap<String, String>,
    pub call_id: String,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            arguments,
            call_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// 工具调用结果：成功或失败，二者不可兼得
#[derive(Debug, Clone)]
pub enum ToolResult {
    Success {
        output: String,
        side_data: Option<serde_json::Value>,
    },
    Failure {
        message: String,
        code: ErrorCode,
    },
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        ToolResult::Success {
            output: output.into(),
            side_data: None,
        }
    }

    pub fn failure(err: &AgentError) -> Self {
        ToolResult::Failure {
            message: err.to_string(),
            code: err.code(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }

    /// 文本视图：成功取 output，失败取 message
    pub fn text(&self) -> &str {
        match self {
            ToolResult::Success { output, .. } => output,
            ToolResult::Failure { message, .. } => message,
        }
    }
}

/// 权限门：高危工具执行前查询外部设置（由宿主运行时实现）
pub trait PermissionGate: Send + Sync {
    fn permission_enabled(&self, setting_key: &str, default: bool) -> bool;
}

/// 配置驱动的权限门：查 [permissions].flags
pub struct ConfigPermissions {
    flags: HashMap<String, bool>,
}

impl ConfigPermissions {
    pub fn new(flags: HashMap<String, bool>) -> Self {
        Self { flags }
    }
}

impl PermissionGate for ConfigPermissions {
    fn permission_enabled(&self, setting_key: &str, default: bool) -> bool {
        self.flags.get(setting_key).copied().unwrap_or(default)
    }
}

/// 全部放行（测试 / 无门禁部署）
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn permission_enabled(&self, _setting_key: &str, _default: bool) -> bool {
        true
    }
}

/// 工具执行器：注册表 + 调度 + 熔断记账。
/// tools 与 health 各自独立互斥域，并发 execute 不会在记账上竞争。
pub struct ToolExecutor {
    tools: RwLock<ToolRegistry>,
    health: Mutex<HealthTable>,
    permissions: Arc<dyn PermissionGate>,
    default_timeout: Duration,
    category_timeouts: CategoryTimeoutsSection,
}

impl ToolExecutor {
    pub fn new(cfg: &ToolsSection, permissions: Arc<dyn PermissionGate>) -> Self {
        Self {
            tools: RwLock::new(ToolRegistry::new()),
            health: Mutex::new(HealthTable::new(
                cfg.disable_threshold,
                cfg.protected.iter().cloned(),
            )),
            permissions,
            default_timeout: Duration::from_secs(cfg.default_timeout_secs),
            category_timeouts: cfg.timeouts.clone(),
        }
    }

    /// 注册工具；同名替换并重置其健康状态
    pub async fn register(&self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.write().await.register(tool);
        self.health.lock().await.enable(&name);
    }

    /// 重新启用被熔断的工具（外部 re-enable 指令）
    pub async fn enable(&self, name: &str) {
        self.health.lock().await.enable(name);
        tracing::info!(tool = name, "tool re-enabled");
    }

    pub async fn tool_health(&self, name: &str) -> ToolHealth {
        self.health.lock().await.health(name)
    }

    pub async fn tool_names(&self) -> Vec<String> {
        self.tools.read().await.tool_names()
    }

    pub async fn schema_json(&self) -> String {
        self.tools.read().await.to_schema_json()
    }

    /// 执行一次工具调用。explicit_timeout 覆盖类别 / 默认超时；
    /// Delegation 类工具豁免外层超时（依赖其内部截止时间）。
    pub async fn execute(&self, call: &ToolCall, explicit_timeout: Option<Duration>) -> ToolResult {
        let start = Instant::now();
        let result = self.dispatch(call, explicit_timeout).await;

        let (ok, outcome) = match &result {
            ToolResult::Success { .. } => (true, "ok"),
            ToolResult::Failure { code, .. } => (
                false,
                match code {
                    ErrorCode::Timeout => "timeout",
                    ErrorCode::Disabled => "disabled",
                    _ => "error",
                },
            ),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": call.name,
            "call_id": call.call_id,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(&call.arguments),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        result
    }

    async fn dispatch(&self, call: &ToolCall, explicit_timeout: Option<Duration>) -> ToolResult {
        // 1. 熔断检查
        if self.health.lock().await.is_disabled(&call.name) {
            return ToolResult::Failure {
                message: format!(
                    "Tool '{}' is disabled after repeated failures. Re-enable it with enable(\"{}\").",
                    call.name, call.name
                ),
                code: ErrorCode::Disabled,
            };
        }

        // 2. 查找；未知工具报错时附上完整清单（兼作可发现性）
        let tool = match self.tools.read().await.get(&call.name) {
            Some(t) => t,
            None => {
                let names = self.tools.read().await.tool_names();
                return ToolResult::Failure {
                    message: format!(
                        "Unknown tool '{}'. Available tools: {}",
                        call.name,
                        names.join(", ")
                    ),
                    code: ErrorCode::ExecutionFailed,
                };
            }
        };

        // 3. 权限门：High 及以上需外部放行
        if tool.risk_level() >= RiskLevel::High {
            let key = format!("tools.{}.allowed", call.name);
            if !self.permissions.permission_enabled(&key, false) {
                return ToolResult::failure(&AgentError::Unauthorized(format!(
                    "tool '{}' requires user permission ({})",
                    call.name, key
                )));
            }
        }

        // 4. 参数校验：失败同样计入熔断（反复用坏参数调用的工具同样值得标记）
        if let Err(e) = tool.validate(&call.arguments) {
            self.record_failure(&call.name).await;
            return ToolResult::failure(&e);
        }

        // 5. 执行与截止时间竞速；Delegation 类豁免
        let deadline = match tool.category() {
            ToolCategory::Delegation => None,
            ToolCategory::Io => Some(
                explicit_timeout.unwrap_or_else(|| {
                    self.category_timeouts
                        .io
                        .map(Duration::from_secs)
                        .unwrap_or(self.default_timeout)
                }),
            ),
            ToolCategory::Network => Some(
                explicit_timeout.unwrap_or_else(|| {
                    self.category_timeouts
                        .network
                        .map(Duration::from_secs)
                        .unwrap_or(self.default_timeout)
                }),
            ),
            ToolCategory::Standard => Some(explicit_timeout.unwrap_or(self.default_timeout)),
        };

        let outcome = match deadline {
            Some(dur) => match timeout(dur, tool.execute(&call.arguments)).await {
                Ok(r) => r,
                // 截止时间胜出：败者随 future 丢弃取消
                Err(_) => Err(AgentError::Timeout {
                    tool: call.name.clone(),
                    secs: dur.as_secs(),
                }),
            },
            None => tool.execute(&call.arguments).await,
        };

        // 6. 健康记账
        match outcome {
            Ok(output) => {
                self.health.lock().await.record_success(&call.name);
                ToolResult::success(output)
            }
            Err(e) => {
                self.record_failure(&call.name).await;
                ToolResult::failure(&e)
            }
        }
    }

    async fn record_failure(&self, name: &str) {
        if self.health.lock().await.record_failure(name) {
            tracing::warn!(tool = name, "tool auto-disabled after repeated failures");
        }
    }
}

fn args_preview(args: &HashMap<String, String>) -> String {
    let s = serde_json::to_string(args).unwrap_or_default();
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

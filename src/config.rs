//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SWARM__*` 覆盖（双下划线表示嵌套，
//! 如 `SWARM__SUBAGENTS__CAPACITY=8`）。规格中的数值默认（容量、超时、熔断阈值）
//! 均为配置而非契约，部署侧可按需覆盖。

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub tools: ToolsSection,
    #[serde(default)]
    pub subagents: SubAgentsSection,
    #[serde(default)]
    pub permissions: PermissionsSection,
}

/// [tools] 段：超时、熔断阈值、保护名单
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用默认超时（秒）
    pub default_timeout_secs: u64,
    /// 连续失败多少次后自动禁用
    pub disable_threshold: u32,
    /// 永不禁用的工具名（失败计数达阈值时清零而非禁用）
    pub protected: Vec<String>,
    /// 按类别覆盖超时（秒）：io / network；delegation 类工具豁免外层超时
    pub timeouts: CategoryTimeoutsSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_tool_timeout_secs(),
            disable_threshold: default_disable_threshold(),
            protected: default_protected(),
            timeouts: CategoryTimeoutsSection::default(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    30
}

fn default_disable_threshold() -> u32 {
    50
}

fn default_protected() -> Vec<String> {
    // 委派工具是 agent 应答能力的根基，高负载下也不得被熔断
    vec!["call_subordinate".into(), "delegate_parallel".into()]
}

/// [tools.timeouts] 段：类别级超时覆盖（未设置则用 default_timeout_secs）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CategoryTimeoutsSection {
    pub io: Option<u64>,
    pub network: Option<u64>,
}

/// [subagents] 段：并发容量、超时、转发节流
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubAgentsSection {
    /// 推理部署形态：local（本机推理，保守容量）/ cloud（云端，放宽）
    pub profile: String,
    /// 并发子代理上限；未设置时按 profile 取默认（local=2，cloud=6）
    pub capacity: Option<usize>,
    /// 单次子代理运行的全局超时（秒）
    pub run_timeout_secs: u64,
    /// 并行批次的共享截止时间（秒）
    pub global_timeout_secs: u64,
    /// 并行批次任务数上限；未设置时等于容量
    pub batch_cap: Option<usize>,
    /// 步骤转发节流间隔（毫秒）；终结事件不受节流
    pub relay_interval_ms: u64,
    /// 转发注册表条目 TTL（秒），超龄条目在下次注册时顺带清理
    pub relay_ttl_secs: u64,
}

impl Default for SubAgentsSection {
    fn default() -> Self {
        Self {
            profile: default_deploy_profile(),
            capacity: None,
            run_timeout_secs: default_run_timeout_secs(),
            global_timeout_secs: default_global_timeout_secs(),
            batch_cap: None,
            relay_interval_ms: default_relay_interval_ms(),
            relay_ttl_secs: default_relay_ttl_secs(),
        }
    }
}

fn default_deploy_profile() -> String {
    "local".to_string()
}

fn default_run_timeout_secs() -> u64 {
    600
}

fn default_global_timeout_secs() -> u64 {
    600
}

fn default_relay_interval_ms() -> u64 {
    500
}

fn default_relay_ttl_secs() -> u64 {
    900
}

impl SubAgentsSection {
    /// 实际容量：显式配置优先，否则按部署形态取默认
    pub fn effective_capacity(&self) -> usize {
        self.capacity.unwrap_or(match self.profile.as_str() {
            "cloud" => 6,
            _ => 2,
        })
    }

    /// 实际批次上限：默认与容量一致
    pub fn effective_batch_cap(&self) -> usize {
        self.batch_cap.unwrap_or_else(|| self.effective_capacity())
    }
}

/// [permissions] 段：settingKey -> 是否放行（高危工具执行前查询）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PermissionsSection {
    pub flags: HashMap<String, bool>,
}

/// 从 config 目录加载配置，环境变量 SWARM__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SWARM__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SWARM")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

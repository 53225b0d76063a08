//! 工具健康记账与熔断
//!
//! 每个工具名维护 {连续失败计数, 是否禁用}：成功清零，失败（含校验失败与超时）加一，
//! 达到阈值即禁用；保护名单内的工具清零计数而非禁用（核心能力不得因抖动下线）。

use std::collections::{HashMap, HashSet};

/// 单个工具的健康状态
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolHealth {
    pub error_count: u32,
    pub disabled: bool,
}

/// 健康表：ToolExecutor 互斥域内的记账状态机
pub struct HealthTable {
    health: HashMap<String, ToolHealth>,
    threshold: u32,
    protected: HashSet<String>,
}

impl HealthTable {
    pub fn new(threshold: u32, protected: impl IntoIterator<Item = String>) -> Self {
        Self {
            health: HashMap::new(),
            threshold: threshold.max(1),
            protected: protected.into_iter().collect(),
        }
    }

    pub fn health(&self, name: &str) -> ToolHealth {
        self.health.get(name).copied().unwrap_or_default()
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.health(name).disabled
    }

    /// 成功：计数清零（禁用标记不在此处恢复，需显式 enable）
    pub fn record_success(&mut self, name: &str) {
        self.health.entry(name.to_string()).or_default().error_count = 0;
    }

    /// 失败：计数加一；达阈值时禁用（保护名单则清零重来）。返回本次是否触发禁用。
    pub fn record_failure(&mut self, name: &str) -> bool {
        let entry = self.health.entry(name.to_string()).or_default();
        entry.error_count += 1;
        if entry.error_count >= self.threshold {
            if self.protected.contains(name) {
                entry.error_count = 0;
            } else {
                entry.disabled = true;
                return true;
            }
        }
        false
    }

    /// 重新启用：清禁用标记与计数（外部 re-enable 指令 / 重新注册时调用）
    pub fn enable(&mut self, name: &str) {
        self.health.insert(name.to_string(), ToolHealth::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disable_at_threshold() {
        let mut table = HealthTable::new(3, Vec::new());
        assert!(!table.record_failure("t"));
        assert!(!table.record_failure("t"));
        assert!(table.record_failure("t"));
        assert!(table.is_disabled("t"));
        assert_eq!(table.health("t").error_count, 3);
    }

    #[test]
    fn test_success_resets_counter() {
        let mut table = HealthTable::new(3, Vec::new());
        table.record_failure("t");
        table.record_failure("t");
        table.record_success("t");
        assert_eq!(table.health("t").error_count, 0);
        // 清零后需重新累满阈值
        table.record_failure("t");
        assert!(!table.is_disabled("t"));
    }

    #[test]
    fn test_protected_resets_instead_of_disable() {
        let mut table = HealthTable::new(2, vec!["vital".to_string()]);
        assert!(!table.record_failure("vital"));
        assert!(!table.record_failure("vital"));
        assert!(!table.is_disabled("vital"));
        assert_eq!(table.health("vital").error_count, 0);
    }

    #[test]
    fn test_enable_clears_both_fields() {
        let mut table = HealthTable::new(1, Vec::new());
        table.record_failure("t");
        assert!(table.is_disabled("t"));
        table.enable("t");
        assert!(!table.is_disabled("t"));
        assert_eq!(table.health("t").error_count, 0);
    }
}

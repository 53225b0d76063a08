//! 档位映射：人类可读的 profile 字符串 -> 内部角色
//!
//! 封闭枚举 + 显式默认分支：调用方用 "coder" / "researcher" 这类称呼请求角色，
//! 不感知内部标识；别名可废弃而不破坏调用方，未知档位一律落到通用角色。

use serde::Serialize;

/// 子代理角色（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    General,
    Coder,
    Researcher,
    Reviewer,
    Writer,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::General => "general",
            AgentRole::Coder => "coder",
            AgentRole::Researcher => "researcher",
            AgentRole::Reviewer => "reviewer",
            AgentRole::Writer => "writer",
        }
    }
}

/// 大小写不敏感地解析 profile；未知取 General
pub fn resolve_profile(profile: &str) -> AgentRole {
    match profile.trim().to_lowercase().as_str() {
        "coder" | "developer" | "engineer" | "programmer" => AgentRole::Coder,
        "researcher" | "research" | "analyst" => AgentRole::Researcher,
        "reviewer" | "review" | "critic" => AgentRole::Reviewer,
        "writer" | "author" | "editor" => AgentRole::Writer,
        _ => AgentRole::General,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_aliases() {
        assert_eq!(resolve_profile("Coder"), AgentRole::Coder);
        assert_eq!(resolve_profile("ENGINEER"), AgentRole::Coder);
        assert_eq!(resolve_profile(" analyst "), AgentRole::Researcher);
        assert_eq!(resolve_profile("critic"), AgentRole::Reviewer);
    }

    #[test]
    fn test_unknown_defaults_to_general() {
        assert_eq!(resolve_profile("wizard"), AgentRole::General);
        assert_eq!(resolve_profile(""), AgentRole::General);
    }
}

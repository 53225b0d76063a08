//! 并行委派载荷的宽容解析
//!
//! 载荷多由 LLM 生成，JSON 未必语法完美；急着拒绝会浪费整轮委派。
//! 按序尝试三个相互独立的策略：严格数组 -> 补方括号 -> 大括号扫描提取，
//! 全部落空（一个任务都救不回来）才拒绝。

use serde::Deserialize;

use crate::core::AgentError;

/// 一条委派任务：{profile, message}
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskSpec {
    #[serde(default = "default_profile")]
    pub profile: String,
    pub message: String,
}

fn default_profile() -> String {
    "general".to_string()
}

/// 解析任务批次；零任务可恢复时返回 InvalidParameter
pub fn parse_task_batch(payload: &str) -> Result<Vec<TaskSpec>, AgentError> {
    let trimmed = payload.trim();

    if let Some(tasks) = parse_strict_array(trimmed) {
        return Ok(tasks);
    }
    if let Some(tasks) = parse_wrapped(trimmed) {
        tracing::debug!("task batch recovered by bracket wrapping");
        return Ok(tasks);
    }
    if let Some(tasks) = parse_brace_scan(trimmed) {
        tracing::debug!(count = tasks.len(), "task batch recovered by brace scan");
        return Ok(tasks);
    }

    Err(AgentError::InvalidParameter(format!(
        "tasks: could not recover any {{profile, message}} objects from payload ({} chars)",
        trimmed.len()
    )))
}

/// 策略 1：良构 JSON 数组
fn parse_strict_array(payload: &str) -> Option<Vec<TaskSpec>> {
    serde_json::from_str::<Vec<TaskSpec>>(payload)
        .ok()
        .filter(|t| !t.is_empty())
}

/// 策略 2：裸逗号分隔对象列表，补上方括号再试
fn parse_wrapped(payload: &str) -> Option<Vec<TaskSpec>> {
    if payload.starts_with('[') {
        return None;
    }
    parse_strict_array(&format!("[{}]", payload))
}

/// 策略 3：尽力而为地扫出顶层大括号片段逐个解析，跳过解析不动的片段。
/// 扫描感知字符串字面量与转义，大括号出现在字符串里不计入深度。
fn parse_brace_scan(payload: &str) -> Option<Vec<TaskSpec>> {
    let mut tasks = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in payload.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some(s) = start.take() {
                        let fragment = &payload[s..=i];
                        if let Ok(task) = serde_json::from_str::<TaskSpec>(fragment) {
                            tasks.push(task);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    if tasks.is_empty() {
        None
    } else {
        Some(tasks)
    }
}

//! 子代理过程事件：用于流式展示思考、工具调用、观察与最终回答
//!
//! 每个事件携带 origin 标签；跨子代理转发到父流时由编排器改写标签，
//! 并发子代理的事件在父流中交错是预期行为，消费方按标签区分。

use serde::Serialize;

/// 事件类别；FinalAnswer / Error 为终结类别（转发时不受节流）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Think,
    ToolCall,
    ToolResult,
    FinalAnswer,
    Error,
}

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, Serialize)]
pub struct StepEvent {
    /// 运行内单调递增的序号
    pub seq: u64,
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub content: String,
    /// 工具相关事件携带工具名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// ToolResult 事件的成败
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// 来源标签：产出方的运行身份，转发时改写为子代理标识
    pub origin: String,
    /// 毫秒时间戳
    pub timestamp: i64,
}

impl StepEvent {
    pub fn new(seq: u64, kind: StepKind, content: impl Into<String>, origin: &str) -> Self {
        Self {
            seq,
            kind,
            content: content.into(),
            tool_name: None,
            success: None,
            origin: origin.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn think(seq: u64, content: impl Into<String>, origin: &str) -> Self {
        Self::new(seq, StepKind::Think, content, origin)
    }

    pub fn tool_call(seq: u64, tool: &str, content: impl Into<String>, origin: &str) -> Self {
        let mut ev = Self::new(seq, StepKind::ToolCall, content, origin);
        ev.tool_name = Some(tool.to_string());
        ev
    }

    pub fn tool_result(
        seq: u64,
        tool: &str,
        content: impl Into<String>,
        success: bool,
        origin: &str,
    ) -> Self {
        let mut ev = Self::new(seq, StepKind::ToolResult, content, origin);
        ev.tool_name = Some(tool.to_string());
        ev.success = Some(success);
        ev
    }

    pub fn final_answer(seq: u64, content: impl Into<String>, origin: &str) -> Self {
        Self::new(seq, StepKind::FinalAnswer, content, origin)
    }

    pub fn error(seq: u64, content: impl Into<String>, origin: &str) -> Self {
        Self::new(seq, StepKind::Error, content, origin)
    }

    /// 终结事件：结束对话的事件，转发时永不丢弃、不节流
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, StepKind::FinalAnswer | StepKind::Error)
    }

    /// 改写来源标签（转发到父流前调用）
    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin = origin.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_kinds() {
        assert!(StepEvent::final_answer(1, "done", "a").is_terminal());
        assert!(StepEvent::error(1, "oops", "a").is_terminal());
        assert!(!StepEvent::think(1, "hmm", "a").is_terminal());
        assert!(!StepEvent::tool_result(1, "echo", "hi", true, "a").is_terminal());
    }

    #[test]
    fn test_serializes_snake_case_tag() {
        let ev = StepEvent::tool_result(2, "echo", "hi", false, "coder[0]");
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"type\":\"tool_result\""));
        assert!(json.contains("\"origin\":\"coder[0]\""));
        assert!(json.contains("\"success\":false"));
    }

    #[test]
    fn test_with_origin_rewrites_label() {
        let ev = StepEvent::think(1, "hmm", "child").with_origin("researcher[2]");
        assert_eq!(ev.origin, "researcher[2]");
    }
}

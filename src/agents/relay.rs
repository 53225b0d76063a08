//! 步骤转发注册表：父运行 id -> 实时输出通道
//!
//! 后代运行不经调用栈回传进度，而是查表把事件推进祖先的通道。
//! 无界发送保证转发方永不被阻塞（通道满 / 堵塞不得拖停运行中的子代理）；
//! 超龄条目在下次注册时顺带清理，兜住崩溃后未注销的运行。

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::agents::events::StepEvent;

struct RelayEntry {
    tx: mpsc::UnboundedSender<StepEvent>,
    registered_at: Instant,
}

/// 步骤转发注册表
pub struct StepRelay {
    entries: Mutex<HashMap<String, RelayEntry>>,
    ttl: Duration,
}

impl StepRelay {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// 注册父运行的输出通道；顺带清理超龄条目
    pub fn register(&self, parent_id: &str, tx: mpsc::UnboundedSender<StepEvent>) {
        let mut entries = self.entries.lock().expect("relay lock poisoned");
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, e| now.duration_since(e.registered_at) < self.ttl);
        let purged = before - entries.len();
        if purged > 0 {
            tracing::debug!(purged, "purged stale relay entries");
        }
        entries.insert(
            parent_id.to_string(),
            RelayEntry {
                tx,
                registered_at: now,
            },
        );
    }

    pub fn unregister(&self, parent_id: &str) {
        self.entries
            .lock()
            .expect("relay lock poisoned")
            .remove(parent_id);
    }

    /// 向父通道转发事件；父已结束（未注册）则静默丢弃，发送永不阻塞
    pub fn forward(&self, parent_id: &str, event: StepEvent) {
        let entries = self.entries.lock().expect("relay lock poisoned");
        if let Some(entry) = entries.get(parent_id) {
            // 接收端已关闭同样按无父处理
            let _ = entry.tx.send(event);
        }
    }

    pub fn registered_count(&self) -> usize {
        self.entries.lock().expect("relay lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forward_reaches_registered_parent() {
        let relay = StepRelay::new(Duration::from_secs(900));
        let (tx, mut rx) = mpsc::unbounded_channel();
        relay.register("p1", tx);

        relay.forward("p1", StepEvent::think(1, "working", "child"));
        let got = rx.recv().await.unwrap();
        assert_eq!(got.content, "working");
    }

    #[tokio::test]
    async fn test_forward_to_unknown_parent_is_noop() {
        let relay = StepRelay::new(Duration::from_secs(900));
        // 不注册直接转发：不得 panic，不得阻塞
        relay.forward("ghost", StepEvent::error(1, "x", "child"));
        assert_eq!(relay.registered_count(), 0);
    }

    #[tokio::test]
    async fn test_unregister_then_forward_drops_silently() {
        let relay = StepRelay::new(Duration::from_secs(900));
        let (tx, mut rx) = mpsc::unbounded_channel();
        relay.register("p1", tx);
        relay.unregister("p1");

        relay.forward("p1", StepEvent::think(1, "late", "child"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entries_purged_on_register() {
        let relay = StepRelay::new(Duration::from_secs(900));
        let (tx1, _rx1) = mpsc::unbounded_channel();
        relay.register("old", tx1);

        tokio::time::advance(Duration::from_secs(901)).await;

        let (tx2, _rx2) = mpsc::unbounded_channel();
        relay.register("new", tx2);
        assert_eq!(relay.registered_count(), 1);
    }
}

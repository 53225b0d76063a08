//! 挂起操作表：回调世界与 async/await 之间的精确一次桥接
//!
//! 外部进程外层（终端、浏览器 UI）完成动作后异步回投结果，内部代码需要 await 它。
//! 以生成的 id 为键登记「一个等待者 + 一个缓存槽」，deliver / 超时二者竞速，
//! 「是否已恢复」的判定就是 Mutex 下对 Option<Sender> 的 take——天然精确一次，
//! 不存在双重恢复，也不会静默丢弃迟到的结果（迟到结果回写缓存槽）。

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};

/// 错误以哨兵前缀编码在同一条字符串通道上（下游统一消费单一字符串结果）
pub const ERROR_PREFIX: &str = "ERROR: ";

/// 判断结果是否为错误哨兵
pub fn is_error_value(value: &str) -> bool {
    value.starts_with(ERROR_PREFIX)
}

#[derive(Default)]
struct Slot {
    /// 当前挂起的等待者；take 即「已恢复」标记
    waiter: Option<oneshot::Sender<String>>,
    /// 先于 wait 到达（或等待者已离场后到达）的结果
    cached: Option<String>,
}

/// 挂起操作表：id -> {等待者, 缓存}，全进程共享，单 Mutex 互斥域
#[derive(Default)]
pub struct PendingOperationTable {
    slots: Mutex<HashMap<String, Slot>>,
}

impl PendingOperationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 等待 id 的结果，最多 timeout。
    ///
    /// 结果已缓存则立即消费返回（不挂起）；否则登记等待者并与截止时间竞速：
    /// deliver / deliver_error / 截止时间三者先到先得，截止时间到返回 None。
    /// 对同一 id 的后续 wait 会顶替旧等待者（旧者以 None 恢复）。
    pub async fn wait(&self, id: &str, timeout: Duration) -> Option<String> {
        let mut rx = {
            let mut slots = self.slots.lock().await;
            if let Some(slot) = slots.get_mut(id) {
                if let Some(value) = slot.cached.take() {
                    slots.remove(id);
                    return Some(value);
                }
            }
            let (tx, rx) = oneshot::channel();
            slots.entry(id.to_string()).or_default().waiter = Some(tx);
            rx
        };

        match tokio::time::timeout(timeout, &mut rx).await {
            // 生产者恢复了我们；条目已由 deliver 侧移除
            Ok(Ok(value)) => Some(value),
            // 等待者被 cleanup 丢弃
            Ok(Err(_)) => None,
            // 截止时间先到：在互斥域内撤下等待者。投递与截止的窄窗口竞速里
            // 投递可能已经送达，先补查一次通道，保证二者互斥且恰好恢复一次。
            Err(_) => {
                let mut slots = self.slots.lock().await;
                if let Ok(value) = rx.try_recv() {
                    return Some(value);
                }
                if let Some(slot) = slots.get_mut(id) {
                    slot.waiter = None;
                    if slot.cached.is_none() {
                        slots.remove(id);
                    }
                }
                None
            }
        }
    }

    /// 投递结果：有等待者则恢复它（精确一次），否则缓存供后续 wait 消费。
    /// 对未知 / 已清理的 id 不报错——生产者无从得知等待者是否还在。
    pub async fn deliver(&self, id: &str, value: impl Into<String>) {
        self.resolve(id, value.into()).await;
    }

    /// 投递错误：编码为哨兵字符串，走同一条结果通道
    pub async fn deliver_error(&self, id: &str, message: impl AsRef<str>) {
        self.resolve(id, format!("{}{}", ERROR_PREFIX, message.as_ref()))
            .await;
    }

    async fn resolve(&self, id: &str, value: String) {
        let mut slots = self.slots.lock().await;
        match slots.remove(id) {
            Some(Slot {
                waiter: Some(tx), ..
            }) => {
                // 等待者可能恰在此刻因超时离场；send 失败则回写缓存而非丢弃
                if let Err(value) = tx.send(value) {
                    slots.insert(
                        id.to_string(),
                        Slot {
                            waiter: None,
                            cached: Some(value),
                        },
                    );
                }
            }
            _ => {
                // 无等待者：缓存（后到的投递覆盖旧缓存）
                slots.insert(
                    id.to_string(),
                    Slot {
                        waiter: None,
                        cached: Some(value),
                    },
                );
            }
        }
    }

    /// 无条件清理 id 的等待者与缓存；空清理安全。
    /// 丢弃等待者的 Sender 会让挂起的 wait 以 None 恢复，不会悬挂。
    pub async fn cleanup(&self, id: &str) {
        self.slots.lock().await.remove(id);
    }

    /// 当前登记的条目数（测试 / 指标用）
    pub async fn pending_count(&self) -> usize {
        self.slots.lock().await.len()
    }
}

//! 并发槽位池：限制同时运行的子代理数量
//!
//! 非阻塞计数信号量：try_acquire 满员立即失败（委派请求快速报错重试，绝不静默排队），
//! RAII 凭据在 drop 时归还槽位，取消 / abort 也不会泄漏。

use std::sync::{Arc, Mutex};

/// 并发槽位池：0 <= active <= capacity 恒成立
pub struct ConcurrencySlotPool {
    active: Mutex<usize>,
    capacity: usize,
}

impl ConcurrencySlotPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            active: Mutex::new(0),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 当前占用数
    pub fn active(&self) -> usize {
        *self.active.lock().expect("slot pool lock poisoned")
    }

    /// 尝试占用一个槽位：active < capacity 时原子递增并返回凭据，否则 None（不阻塞）
    pub fn try_acquire(self: &Arc<Self>) -> Option<SlotPermit> {
        let mut active = self.active.lock().expect("slot pool lock poisoned");
        if *active < self.capacity {
            *active += 1;
            Some(SlotPermit {
                pool: Arc::clone(self),
            })
        } else {
            None
        }
    }

    /// 归还槽位；下限钳在 0（防御重复归还）
    fn release(&self) {
        let mut active = self.active.lock().expect("slot pool lock poisoned");
        *active = active.saturating_sub(1);
    }
}

/// 槽位凭据：drop 即归还，所有退出路径（成功 / 失败 / 超时 / abort）都不泄漏
pub struct SlotPermit {
    pool: Arc<ConcurrencySlotPool>,
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        self.pool.release();
    }
}

//! 会话监管：同一 thread 的轮次串行执行
//!
//! 不同 thread 互不影响、可并发；同一 thread 的两个轮次并发会交错写 checkpoint，
//! 因此每轮在 load 之前获取该 thread 的锁，直到 append 完成后释放。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct SessionSupervisor {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取 thread 锁；返回的 guard 释放时解锁
    pub async fn acquire(&self, thread_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // 只被表本身引用的锁无人持有也无人等待，可以回收
            locks.retain(|id, l| id == thread_id || Arc::strong_count(l) > 1);
            locks
                .entry(thread_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    pub async fn tracked_threads(&self) -> usize {
        self.locks.lock().await.len()
    }
}

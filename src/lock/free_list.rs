//! 锁实例空闲列表
//!
//! 回收的锁实例放入无锁队列，后续创建锁时优先复用，避免频繁分配。
//! 空闲列表是显式对象，由拥有者创建并注入，而不是进程级全局变量。

use crossbeam_queue::SegQueue;
use std::sync::Arc;
use std::time::Duration;

use super::lock::{Lock, LockInner, OnEmpty};

/// 锁实例空闲列表（克隆共享同一个列表）
#[derive(Clone, Default)]
pub struct LockPool {
    free: Arc<SegQueue<Arc<LockInner>>>,
}

impl LockPool {
    /// 创建空的空闲列表
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建锁：优先复用空闲实例
    ///
    /// # 参数
    ///
    /// * `timeout` - 获取锁的超时时间，`None` 表示无限等待
    pub fn create_lock(&self, timeout: Option<Duration>) -> Lock {
        self.create_lock_with_on_empty(timeout, None)
    }

    pub(crate) fn create_lock_with_on_empty(
        &self,
        timeout: Option<Duration>,
        on_empty: Option<OnEmpty>,
    ) -> Lock {
        match self.free.pop() {
            Some(inner) => {
                let generation = inner.revive(timeout, on_empty);
                Lock::from_parts(inner, generation, self.clone())
            }
            None => {
                let inner = LockInner::new(timeout, on_empty);
                let generation = inner.generation();
                Lock::from_parts(inner, generation, self.clone())
            }
        }
    }

    /// 空闲实例个数
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub(crate) fn put_back(&self, inner: Arc<LockInner>) {
        self.free.push(inner);
    }
}

impl std::fmt::Debug for LockPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockPool")
            .field("free", &self.free.len())
            .finish()
    }
}

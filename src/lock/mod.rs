//! 锁模块
//!
//! 提供带获取超时的单持有者互斥锁、锁实例空闲列表以及按键管理的锁集合

pub mod lock;
pub mod free_list;
pub mod keyed;

pub use lock::{Lock, OnEmpty};
pub use free_list::LockPool;
pub use keyed::{DashMapLockStore, KeyedLocks, LockStore};

use std::time::Duration;

/// 从空闲列表创建一把锁
///
/// # 参数
///
/// * `pool` - 锁实例空闲列表
/// * `timeout_ms` - 获取超时（毫秒），`None` 表示无限等待
pub fn create_lock(pool: &LockPool, timeout_ms: Option<u64>) -> Lock {
    pool.create_lock(timeout_ms.map(Duration::from_millis))
}

/// 创建按键管理的锁集合
///
/// # 参数
///
/// * `pool` - 锁实例空闲列表
/// * `timeout_ms` - 每把锁的获取超时（毫秒），`None` 表示无限等待
pub fn create_locks_by_key<K>(pool: &LockPool, timeout_ms: Option<u64>) -> KeyedLocks<K>
where
    K: Eq + std::hash::Hash + Clone + Send + Sync + 'static,
{
    KeyedLocks::new(pool.clone(), timeout_ms.map(Duration::from_millis))
}

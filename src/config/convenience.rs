//! # 便利配置函数模块
//!
//! 常用配置组合的便利函数，内部仍走构建器校验

use crate::config::builders::{LockConfigBuilder, PoolConfigBuilder};
use crate::config::core::LockConfig;
use crate::error::QuickPoolResult;
use crate::pool::PoolConfig;

/// 只限制容量的资源池配置
///
/// # 参数
///
/// * `max_size` - 最大资源数
pub fn pool_config(max_size: u32) -> QuickPoolResult<PoolConfig> {
    PoolConfigBuilder::new()
        .max_size(max_size)
        .no_release_timeout()
        .no_queue_timeout()
        .no_idle_timeout()
        .unlimited_uses()
        .build()
}

/// 带租约归还时限的资源池配置
///
/// # 参数
///
/// * `max_size` - 最大资源数
/// * `release_timeout_ms` - 租约归还时限（毫秒）
pub fn guarded_pool_config(max_size: u32, release_timeout_ms: u64) -> QuickPoolResult<PoolConfig> {
    PoolConfigBuilder::new()
        .max_size(max_size)
        .release_timeout_ms(release_timeout_ms)
        .no_queue_timeout()
        .no_idle_timeout()
        .unlimited_uses()
        .build()
}

/// 锁配置，`timeout_ms` 为 `None` 时无限等待
pub fn lock_config(timeout_ms: Option<u64>) -> QuickPoolResult<LockConfig> {
    let builder = LockConfigBuilder::new();
    match timeout_ms {
        Some(timeout) => builder.timeout_ms(timeout).build(),
        None => builder.wait_indefinitely().build(),
    }
}

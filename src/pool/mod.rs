//! 资源池模块
//!
//! 通用的租约式资源池：容量上限、FIFO 排队、归还超时强制回收与优雅排空。
//! 资源的打开与关闭由调用方实现的 [`ResourceManager`] 完成。

pub mod types;
pub mod config;
pub mod lease;
pub mod pool;

pub use types::{PoolStats, ResourceManager};
pub use config::PoolConfig;
pub use lease::Lease;
pub use pool::ResourcePool;

use crate::error::QuickPoolResult;

/// 创建资源池
pub fn create_resource_pool<M: ResourceManager>(
    manager: M,
    config: PoolConfig,
) -> QuickPoolResult<ResourcePool<M>> {
    ResourcePool::new(manager, config)
}

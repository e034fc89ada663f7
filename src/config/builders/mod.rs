//! # 配置构建器模块
//!
//! 提供所有配置类型的构建器实现，支持链式调用和严格验证

pub mod lock_builder;
pub mod pool_builder;
pub mod quick_pool_builder;

pub use lock_builder::LockConfigBuilder;
pub use pool_builder::PoolConfigBuilder;
pub use quick_pool_builder::QuickPoolConfigBuilder;

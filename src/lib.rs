//! rat_quickpool - 并发控制与资源池基础库
//!
//! 为数据库客户端提供通用的并发原语：FIFO 双端队列、异步阻塞队列、
//! 带超时的互斥锁与按键锁、租约式资源池、推送转拉取的流适配器，
//! 以及建立在资源池之上的任务/事务协议（嵌套事务、序列化冲突重试、提交后步骤）

// 导出所有公共模块
pub mod error;
pub mod queue;
pub mod lock;
pub mod pool;
pub mod stream;
pub mod transaction;
pub mod config;
pub mod i18n;
pub mod utils;

// 重新导出常用类型和函数
pub use error::{QuickPoolError, QuickPoolResult};
pub use queue::{AsyncQueue, Deque};
pub use lock::{
    create_lock, create_locks_by_key, DashMapLockStore, KeyedLocks, Lock, LockPool, LockStore,
};
pub use pool::{create_resource_pool, Lease, PoolConfig, PoolStats, ResourceManager, ResourcePool};
pub use stream::{push_to_stream, PushSink, PushSource, PushStream};
pub use transaction::{
    Database, IsolationLevel, PostCommitStep, Task, Transaction, TransactionDriver,
    TransactionOptions,
};
pub use config::{
    guarded_pool_config, lock_config, pool_config, LockConfig, LockConfigBuilder,
    PoolConfigBuilder, QuickPoolConfig, QuickPoolConfigBuilder,
};

// 条件编译调试宏 - 只有在 debug 模式下才输出调试信息
#[cfg(debug_assertions)]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        rat_logger::debug!($($arg)*);
    };
}

#[cfg(not(debug_assertions))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        // 在 release 模式下不输出调试信息
    };
}

/// 初始化rat_quickpool库
///
/// 这个函数会初始化多语言错误消息系统，可以重复调用
///
/// 注意：日志系统由调用者自行初始化，本库不会自动初始化日志
pub fn init() {
    i18n::ErrorMessageI18n::init();
}

/// 库版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库名称
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// 获取库信息
pub fn get_info() -> String {
    format!("{} v{}", NAME, VERSION)
}

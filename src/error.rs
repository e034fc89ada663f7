//! 错误处理模块
//!
//! 定义锁、资源池、流适配与事务协议共用的错误类型

use thiserror::Error;

/// rat_quickpool 错误类型
#[derive(Error, Debug)]
pub enum QuickPoolError {
    /// 等待锁超时
    #[error("获取锁超时: 等待超过 {timeout_ms}ms")]
    LockTimedOut { timeout_ms: u64 },

    /// 锁实例已归还到空闲列表
    #[error("锁已被回收到空闲列表，不能再使用")]
    LockInactive,

    /// 锁仍有持有者或等待者，不能回收
    #[error("锁仍在使用中（存在持有者或等待者），不能回收")]
    LockInUse,

    /// 释放了一个未被持有的锁
    #[error("锁未被持有，无法释放")]
    LockNotHeld,

    /// 资源池正在排空
    #[error("资源池正在排空，不再接受新的租用请求")]
    PoolDraining,

    /// 排队等待资源超时
    #[error("等待资源超时: 排队超过 {timeout_ms}ms")]
    QueueTimedOut { timeout_ms: u64 },

    /// 租约超过归还时限被强制回收
    #[error("Transaction aborted: 租约超过归还时限，资源已被强制回收")]
    LeaseAborted,

    /// 重复归还租约
    #[error("租约已经归还，不能重复释放")]
    LeaseAlreadyReleased,

    /// 资源创建或关闭失败
    #[error("资源操作失败: {message}")]
    ResourceError { message: String },

    /// 外部驱动（SQL 执行协作者）返回的错误
    #[error("驱动错误: {message}")]
    DriverError {
        code: Option<String>,
        message: String,
    },

    /// 事务协议错误
    #[error("事务错误: {message}")]
    TransactionError { message: String },

    /// 配置错误
    #[error("配置错误: {message}")]
    ConfigError { message: String },

    /// 序列化错误
    #[error("数据序列化失败: {message}")]
    SerializationError { message: String },

    /// IO错误
    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 其他错误（通常来自调用方回调）
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// rat_quickpool 结果类型
pub type QuickPoolResult<T> = Result<T, QuickPoolError>;

impl QuickPoolError {
    /// 驱动错误码（仅 `DriverError` 携带）
    pub fn code(&self) -> Option<&str> {
        match self {
            QuickPoolError::DriverError { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// 是否为调用方可以重试的超时类错误
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            QuickPoolError::LockTimedOut { .. } | QuickPoolError::QueueTimedOut { .. }
        )
    }
}

/// 快速构建带消息的错误
///
/// ```rust,ignore
/// let err = quick_error!(config, "最大资源数必须设置");
/// let err = quick_error!(driver, "40001", "could not serialize access");
/// ```
#[macro_export]
macro_rules! quick_error {
    (resource, $msg:expr) => {
        $crate::error::QuickPoolError::ResourceError {
            message: $msg.to_string(),
        }
    };
    (transaction, $msg:expr) => {
        $crate::error::QuickPoolError::TransactionError {
            message: $msg.to_string(),
        }
    };
    (config, $msg:expr) => {
        $crate::error::QuickPoolError::ConfigError {
            message: $msg.to_string(),
        }
    };
    (serialization, $msg:expr) => {
        $crate::error::QuickPoolError::SerializationError {
            message: $msg.to_string(),
        }
    };
    (driver, $code:expr, $msg:expr) => {
        $crate::error::QuickPoolError::DriverError {
            code: Some($code.to_string()),
            message: $msg.to_string(),
        }
    };
    (driver, $msg:expr) => {
        $crate::error::QuickPoolError::DriverError {
            code: None,
            message: $msg.to_string(),
        }
    };
}

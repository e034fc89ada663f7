//! # 全局配置构建器模块
//!
//! 提供全局配置的构建器实现，支持链式调用和严格验证

use crate::config::core::{LockConfig, QuickPoolConfig};
use crate::error::QuickPoolResult;
use crate::pool::PoolConfig;
use crate::transaction::TransactionOptions;
use rat_logger::info;

/// 全局配置构建器
#[derive(Debug, Default)]
pub struct QuickPoolConfigBuilder {
    pool: Option<PoolConfig>,
    lock: Option<LockConfig>,
    transaction: Option<TransactionOptions>,
}

impl QuickPoolConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            pool: None,
            lock: None,
            transaction: None,
        }
    }

    /// 设置资源池配置
    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = Some(pool);
        self
    }

    /// 设置锁配置
    pub fn lock(mut self, lock: LockConfig) -> Self {
        self.lock = Some(lock);
        self
    }

    /// 设置默认事务选项
    pub fn transaction(mut self, transaction: TransactionOptions) -> Self {
        self.transaction = Some(transaction);
        self
    }

    /// 构建全局配置
    pub fn build(self) -> QuickPoolResult<QuickPoolConfig> {
        let pool = self.pool.ok_or_else(|| {
            crate::quick_error!(config, crate::i18n::tf("error.field_required", &[("name", "pool")]))
        })?;
        let lock = self.lock.ok_or_else(|| {
            crate::quick_error!(config, crate::i18n::tf("error.field_required", &[("name", "lock")]))
        })?;
        let transaction = self.transaction.ok_or_else(|| {
            crate::quick_error!(config, crate::i18n::tf("error.field_required", &[("name", "transaction")]))
        })?;

        let config = QuickPoolConfig {
            pool,
            lock,
            transaction,
        };
        config.validate()?;
        info!("全局配置构建完成");
        Ok(config)
    }
}

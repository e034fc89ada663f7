//! # 配置管理模块 - 核心配置类型
//!
//! 资源池、锁与事务的默认配置，可从 TOML/JSON 文件加载
//! 严格遵循项目规范：所有配置项必须显式设置，严禁使用默认值

use crate::error::{QuickPoolError, QuickPoolResult};
use crate::lock::{KeyedLocks, Lock, LockPool};
use crate::pool::PoolConfig;
use crate::transaction::TransactionOptions;
use rat_logger::info;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::path::Path;
use std::time::Duration;

/// 全局配置
///
/// 汇总资源池、锁与事务的配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickPoolConfig {
    /// 资源池配置
    pub pool: PoolConfig,
    /// 锁配置
    pub lock: LockConfig,
    /// 默认事务选项
    pub transaction: TransactionOptions,
}

/// 锁配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    /// 获取锁的超时时间（毫秒），`None` 表示无限等待
    pub timeout_ms: Option<u64>,
}

impl LockConfig {
    /// 创建锁配置构建器
    pub fn builder() -> super::builders::LockConfigBuilder {
        super::builders::LockConfigBuilder::new()
    }

    /// 校验配置的合理性
    pub fn validate(&self) -> QuickPoolResult<()> {
        if self.timeout_ms == Some(0) {
            return Err(crate::quick_error!(
                config,
                crate::i18n::tf("error.timeout_zero", &[("name", "timeout_ms")])
            ));
        }
        Ok(())
    }

    /// 获取锁的超时时间
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// 按此配置从空闲列表创建锁
    pub fn create_lock(&self, locks: &LockPool) -> Lock {
        locks.create_lock(self.timeout())
    }

    /// 按此配置创建按键管理的锁
    pub fn create_keyed_locks<K>(&self, locks: &LockPool) -> KeyedLocks<K>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
    {
        KeyedLocks::new(locks.clone(), self.timeout())
    }
}

impl QuickPoolConfig {
    /// 创建全局配置构建器
    pub fn builder() -> super::builders::QuickPoolConfigBuilder {
        super::builders::QuickPoolConfigBuilder::new()
    }

    /// 校验所有子配置
    pub fn validate(&self) -> QuickPoolResult<()> {
        self.pool.validate()?;
        self.lock.validate()?;
        Ok(())
    }

    /// 从配置文件加载配置
    ///
    /// 扩展名为 `toml` 时按 TOML 解析，否则按 JSON 解析
    ///
    /// # 参数
    ///
    /// * `config_path` - 配置文件路径
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> QuickPoolResult<Self> {
        let content = std::fs::read_to_string(config_path.as_ref()).map_err(QuickPoolError::IoError)?;

        let config: QuickPoolConfig = if is_toml(config_path.as_ref()) {
            toml::from_str(&content)
                .map_err(|e| crate::quick_error!(config, format!("解析TOML配置文件失败: {}", e)))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| crate::quick_error!(config, format!("解析JSON配置文件失败: {}", e)))?
        };
        config.validate()?;

        info!("从文件加载配置: {:?}", config_path.as_ref());
        Ok(config)
    }

    /// 保存配置到文件
    ///
    /// # 参数
    ///
    /// * `config_path` - 配置文件路径
    pub fn save_to_file<P: AsRef<Path>>(&self, config_path: P) -> QuickPoolResult<()> {
        let content = if is_toml(config_path.as_ref()) {
            toml::to_string_pretty(self)
                .map_err(|e| crate::quick_error!(serialization, format!("序列化TOML配置失败: {}", e)))?
        } else {
            serde_json::to_string_pretty(self)
                .map_err(|e| crate::quick_error!(serialization, format!("序列化JSON配置失败: {}", e)))?
        };

        std::fs::write(config_path.as_ref(), content).map_err(QuickPoolError::IoError)?;

        info!("保存配置到文件: {:?}", config_path.as_ref());
        Ok(())
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("toml")
}

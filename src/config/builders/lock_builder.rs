//! # 锁配置构建器模块

use crate::config::core::LockConfig;
use crate::error::QuickPoolResult;

/// 锁配置构建器
///
/// 超时必须显式设置数值或显式声明无限等待
#[derive(Debug, Default)]
pub struct LockConfigBuilder {
    timeout_ms: Option<Option<u64>>,
}

impl LockConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self { timeout_ms: None }
    }

    /// 设置获取锁的超时时间（毫秒）
    pub fn timeout_ms(mut self, timeout: u64) -> Self {
        self.timeout_ms = Some(Some(timeout));
        self
    }

    /// 无限等待
    pub fn wait_indefinitely(mut self) -> Self {
        self.timeout_ms = Some(None);
        self
    }

    /// 构建锁配置
    pub fn build(self) -> QuickPoolResult<LockConfig> {
        let timeout_ms = self.timeout_ms.ok_or_else(|| {
            crate::quick_error!(config, crate::i18n::tf("error.field_required", &[("name", "timeout_ms")]))
        })?;
        let config = LockConfig { timeout_ms };
        config.validate()?;
        Ok(config)
    }
}

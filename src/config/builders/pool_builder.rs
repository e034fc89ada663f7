//! # 资源池配置构建器模块
//!
//! 提供资源池配置的构建器实现，支持链式调用和严格验证

use crate::error::QuickPoolResult;
use crate::pool::PoolConfig;
use rat_logger::info;

/// 资源池配置构建器
///
/// 严格要求所有配置项必须显式设置，严禁使用默认值。
/// 可选的时限需要显式设置数值或显式关闭。
#[derive(Debug)]
pub struct PoolConfigBuilder {
    max_size: Option<u32>,
    release_timeout_ms: Option<Option<u64>>,
    queue_timeout_ms: Option<Option<u64>>,
    idle_timeout_ms: Option<Option<u64>>,
    max_uses: Option<Option<u32>>,
}

impl PoolConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            max_size: None,
            release_timeout_ms: None,
            queue_timeout_ms: None,
            idle_timeout_ms: None,
            max_uses: None,
        }
    }

    /// 设置最大资源数
    ///
    /// # 参数
    ///
    /// * `max_size` - 同时打开的最大资源数
    pub fn max_size(mut self, max_size: u32) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// 设置租约归还时限（毫秒）
    ///
    /// # 参数
    ///
    /// * `timeout` - 超过该时限未归还的租约会被强制回收
    pub fn release_timeout_ms(mut self, timeout: u64) -> Self {
        self.release_timeout_ms = Some(Some(timeout));
        self
    }

    /// 不限制租约归还时限
    pub fn no_release_timeout(mut self) -> Self {
        self.release_timeout_ms = Some(None);
        self
    }

    /// 设置排队等待时限（毫秒）
    pub fn queue_timeout_ms(mut self, timeout: u64) -> Self {
        self.queue_timeout_ms = Some(Some(timeout));
        self
    }

    /// 不限制排队等待时限
    pub fn no_queue_timeout(mut self) -> Self {
        self.queue_timeout_ms = Some(None);
        self
    }

    /// 设置空闲资源存活时限（毫秒）
    pub fn idle_timeout_ms(mut self, timeout: u64) -> Self {
        self.idle_timeout_ms = Some(Some(timeout));
        self
    }

    /// 空闲资源永不过期
    pub fn no_idle_timeout(mut self) -> Self {
        self.idle_timeout_ms = Some(None);
        self
    }

    /// 设置单个资源的最大租用次数
    pub fn max_uses(mut self, max_uses: u32) -> Self {
        self.max_uses = Some(Some(max_uses));
        self
    }

    /// 不限制资源的租用次数
    pub fn unlimited_uses(mut self) -> Self {
        self.max_uses = Some(None);
        self
    }

    /// 构建资源池配置
    ///
    /// # 错误
    ///
    /// 如果任何必需的配置项未设置或取值不合理，将返回错误
    pub fn build(self) -> QuickPoolResult<PoolConfig> {
        let max_size = self.max_size.ok_or_else(|| {
            crate::quick_error!(config, crate::i18n::tf("error.field_required", &[("name", "max_size")]))
        })?;

        let release_timeout_ms = self.release_timeout_ms.ok_or_else(|| {
            crate::quick_error!(config, crate::i18n::tf("error.field_required", &[("name", "release_timeout_ms")]))
        })?;

        let queue_timeout_ms = self.queue_timeout_ms.ok_or_else(|| {
            crate::quick_error!(config, crate::i18n::tf("error.field_required", &[("name", "queue_timeout_ms")]))
        })?;

        let idle_timeout_ms = self.idle_timeout_ms.ok_or_else(|| {
            crate::quick_error!(config, crate::i18n::tf("error.field_required", &[("name", "idle_timeout_ms")]))
        })?;

        let max_uses = self.max_uses.ok_or_else(|| {
            crate::quick_error!(config, crate::i18n::tf("error.field_required", &[("name", "max_uses")]))
        })?;

        let config = PoolConfig {
            max_size,
            release_timeout_ms,
            queue_timeout_ms,
            idle_timeout_ms,
            max_uses,
        };
        config.validate()?;

        info!(
            "创建资源池配置: 最大资源数={}, 归还时限={:?}ms, 排队时限={:?}ms",
            max_size, release_timeout_ms, queue_timeout_ms
        );
        Ok(config)
    }
}

impl Default for PoolConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

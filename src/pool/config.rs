//! 资源池配置模块

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::QuickPoolResult;

/// 资源池配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// 同时打开的最大资源数（借出 + 空闲 + 创建中 + 关闭中）
    pub max_size: u32,
    /// 租约归还时限（毫秒），超时强制回收
    pub release_timeout_ms: Option<u64>,
    /// 排队等待资源的时限（毫秒）
    pub queue_timeout_ms: Option<u64>,
    /// 空闲资源的存活时限（毫秒）
    pub idle_timeout_ms: Option<u64>,
    /// 单个资源最多被租用的次数，达到后归还时关闭
    pub max_uses: Option<u32>,
}

impl PoolConfig {
    /// 创建资源池配置构建器
    pub fn builder() -> crate::config::PoolConfigBuilder {
        crate::config::PoolConfigBuilder::new()
    }

    /// 校验配置的合理性
    pub fn validate(&self) -> QuickPoolResult<()> {
        if self.max_size == 0 {
            return Err(crate::quick_error!(
                config,
                crate::i18n::t("error.pool_max_size_zero")
            ));
        }
        for (name, value) in [
            ("release_timeout_ms", self.release_timeout_ms),
            ("queue_timeout_ms", self.queue_timeout_ms),
            ("idle_timeout_ms", self.idle_timeout_ms),
        ] {
            if value == Some(0) {
                return Err(crate::quick_error!(
                    config,
                    crate::i18n::tf("error.timeout_zero", &[("name", name)])
                ));
            }
        }
        if self.max_uses == Some(0) {
            return Err(crate::quick_error!(
                config,
                crate::i18n::t("error.max_uses_zero")
            ));
        }
        Ok(())
    }

    pub(crate) fn release_timeout(&self) -> Option<Duration> {
        self.release_timeout_ms.map(Duration::from_millis)
    }

    pub(crate) fn queue_timeout(&self) -> Option<Duration> {
        self.queue_timeout_ms.map(Duration::from_millis)
    }

    pub(crate) fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_ms.map(Duration::from_millis)
    }
}

//! 资源池类型定义模块

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

use crate::error::QuickPoolResult;

/// 资源生命周期管理，由资源池的使用方提供
///
/// 资源池本身不做任何网络 I/O，所有打开、关闭与中断都委托给这里。
#[async_trait]
pub trait ResourceManager: Send + Sync + 'static {
    /// 被池化的资源类型
    type Resource: Send + Sync + 'static;

    /// 打开一个新资源
    async fn open(&self) -> QuickPoolResult<Self::Resource>;

    /// 关闭资源
    async fn close(&self, resource: &Self::Resource) -> QuickPoolResult<()>;

    /// 租约超过归还时限、资源即将被强制关闭之前调用
    ///
    /// 通常用于通知资源上正在进行的操作中断
    async fn on_release_timeout_exceeded(&self, _resource: &Self::Resource) {}
}

/// 资源池统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// 最大资源数
    pub max_size: u32,
    /// 已打开或正在打开的资源总数
    pub total: usize,
    /// 空闲资源数
    pub idle: usize,
    /// 借出的资源数
    pub on_loan: usize,
    /// 排队等待的调用方个数
    pub waiting: usize,
    /// 正在打开的资源数
    pub opening: usize,
    /// 正在关闭的资源数
    pub closing: usize,
    /// 是否正在排空
    pub draining: bool,
}

/// 租约的中断信号
#[derive(Debug, Default)]
pub(crate) struct LeaseSignal {
    aborted: AtomicBool,
    notify: Notify,
}

impl LeaseSignal {
    pub(crate) fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    pub(crate) async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }
}

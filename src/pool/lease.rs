//! 租约模块
//!
//! 租约独占一个被借出的资源，归还后资源回到空闲集合或直接交给下一个等待者

use rat_logger::debug;
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

use super::types::{LeaseSignal, ResourceManager};
use super::ResourcePool;
use crate::error::{QuickPoolError, QuickPoolResult};

/// 资源交接凭据，由资源池发给排队的调用方
pub(crate) struct Grant<R> {
    pub(crate) id: u64,
    pub(crate) resource: Arc<R>,
    pub(crate) signal: Arc<LeaseSignal>,
}

/// 对资源池中一个资源的临时独占
///
/// 必须显式调用 [`Lease::release`]；未释放就被丢弃时会自动归还。
pub struct Lease<M: ResourceManager> {
    pool: ResourcePool<M>,
    id: u64,
    resource: Arc<M::Resource>,
    signal: Arc<LeaseSignal>,
    released: bool,
}

impl<M: ResourceManager> Lease<M> {
    pub(crate) fn new(pool: ResourcePool<M>, grant: Grant<M::Resource>) -> Self {
        Self {
            pool,
            id: grant.id,
            resource: grant.resource,
            signal: grant.signal,
            released: false,
        }
    }

    /// 租约编号（在所属资源池内唯一）
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 借出的资源
    pub fn resource(&self) -> &M::Resource {
        &self.resource
    }

    /// 租约是否因超过归还时限被强制回收
    pub fn is_aborted(&self) -> bool {
        self.signal.is_aborted()
    }

    /// 等待租约被强制回收
    pub async fn aborted(&self) {
        self.signal.wait().await
    }

    /// 在租约上执行一个操作
    ///
    /// 租约在操作完成前被强制回收时，操作被丢弃并返回 [`QuickPoolError::LeaseAborted`]
    pub async fn run<F, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<QuickPoolError>,
    {
        if self.is_aborted() {
            return Err(QuickPoolError::LeaseAborted.into());
        }
        tokio::select! {
            biased;
            _ = self.signal.wait() => Err(QuickPoolError::LeaseAborted.into()),
            result = operation => result,
        }
    }

    /// 归还资源
    ///
    /// 重复调用返回 [`QuickPoolError::LeaseAlreadyReleased`]
    pub fn release(&mut self) -> QuickPoolResult<()> {
        if self.released {
            return Err(QuickPoolError::LeaseAlreadyReleased);
        }
        self.released = true;
        self.pool.check_in(self.id);
        Ok(())
    }

    /// 关闭资源而不是归还（例如资源已经损坏）
    pub async fn dispose(mut self) -> QuickPoolResult<()> {
        if self.released {
            return Err(QuickPoolError::LeaseAlreadyReleased);
        }
        self.released = true;
        self.pool.dispose(self.id).await
    }
}

impl<M: ResourceManager> Deref for Lease<M> {
    type Target = M::Resource;

    fn deref(&self) -> &Self::Target {
        &self.resource
    }
}

impl<M: ResourceManager> Drop for Lease<M> {
    fn drop(&mut self) {
        if !self.released {
            debug!("租约 {} 未显式释放，自动归还", self.id);
            let _ = self.release();
        }
    }
}

impl<M: ResourceManager> std::fmt::Debug for Lease<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("id", &self.id)
            .field("released", &self.released)
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

//! 基于资源池的数据库句柄

use futures::future::BoxFuture;
use std::future::Future;

use super::task::{Task, Transaction};
use super::types::{TransactionDriver, TransactionOptions};
use crate::error::QuickPoolResult;
use crate::lock::LockPool;
use crate::pool::{PoolStats, ResourceManager, ResourcePool};

/// 数据库句柄
///
/// 每个任务从资源池租用一个资源，任务结束（无论成功失败）后归还。
pub struct Database<M: ResourceManager> {
    pool: ResourcePool<M>,
    locks: LockPool,
}

impl<M: ResourceManager> Clone for Database<M> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            locks: self.locks.clone(),
        }
    }
}

impl<M: ResourceManager> Database<M> {
    /// 使用资源池创建数据库句柄
    pub fn new(pool: ResourcePool<M>) -> Self {
        Self::with_lock_pool(pool, LockPool::new())
    }

    /// 指定任务事务锁使用的锁空闲列表
    pub fn with_lock_pool(pool: ResourcePool<M>, locks: LockPool) -> Self {
        Self { pool, locks }
    }

    /// 底层资源池
    pub fn pool(&self) -> &ResourcePool<M> {
        &self.pool
    }

    /// 资源池统计信息
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// 租用一个资源执行 `f`，结束后归还
    ///
    /// 租约在执行期间被强制回收时返回 [`crate::QuickPoolError::LeaseAborted`]。
    pub async fn task<F, T>(&self, f: F) -> QuickPoolResult<T>
    where
        F: for<'a> FnOnce(&'a Task<M>) -> BoxFuture<'a, QuickPoolResult<T>>,
    {
        let lease = self.pool.get_connection().await?;
        let task = Task::new(lease, self.locks.create_lock(None));
        let result = task.run(f(&task)).await;
        task.finish();
        result
    }

    /// 在新任务上执行事务，详见 [`Task::tx`]
    pub async fn tx<F, T>(&self, f: F, options: TransactionOptions) -> QuickPoolResult<T>
    where
        M::Resource: TransactionDriver,
        F: for<'a> FnMut(&'a Transaction<M>) -> BoxFuture<'a, QuickPoolResult<T>>,
    {
        let lease = self.pool.get_connection().await?;
        let task = Task::new(lease, self.locks.create_lock(None));
        let result = task.tx(f, options).await;
        task.finish();
        result
    }

    /// 注册提交后步骤；数据库句柄本身不在事务中，因此立即执行
    pub async fn add_post_commit_step<F, Fut>(&self, step: F) -> QuickPoolResult<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = QuickPoolResult<()>> + Send + 'static,
    {
        step().await
    }

    /// 排空资源池
    pub async fn drain(&self) -> QuickPoolResult<()> {
        self.pool.drain().await
    }
}

impl<M: ResourceManager> std::fmt::Debug for Database<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("pool", &self.pool).finish()
    }
}

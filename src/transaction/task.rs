//! 任务与事务上下文
//!
//! [`Task`] 独占一个租约；在其上开启的最外层事务由任务内的锁串行化。
//! [`Transaction`] 显式记录嵌套深度：只有 0→1 发出 BEGIN，1→0 发出 COMMIT，
//! 内层事务注册的提交后步骤推迟到最外层提交之后执行。

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use rat_logger::{debug, info, warn};
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

use super::types::{PostCommitStep, TransactionDriver, TransactionOptions};
use crate::error::{QuickPoolError, QuickPoolResult};
use crate::lock::Lock;
use crate::pool::{Lease, ResourceManager};

struct TaskInner<M: ResourceManager> {
    lease: Lease<M>,
    tx_lock: Lock,
}

/// 一个工作单元，独占一个租用的资源
pub struct Task<M: ResourceManager> {
    inner: Arc<TaskInner<M>>,
}

impl<M: ResourceManager> Task<M> {
    pub(crate) fn new(lease: Lease<M>, tx_lock: Lock) -> Self {
        Self {
            inner: Arc::new(TaskInner { lease, tx_lock }),
        }
    }

    fn share(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }

    /// 租用的资源
    pub fn resource(&self) -> &M::Resource {
        self.inner.lease.resource()
    }

    /// 底层租约
    pub fn lease(&self) -> &Lease<M> {
        &self.inner.lease
    }

    /// 租约是否已被强制回收
    pub fn is_aborted(&self) -> bool {
        self.inner.lease.is_aborted()
    }

    /// 在租约上执行操作，租约被强制回收时返回 [`QuickPoolError::LeaseAborted`]
    pub async fn run<F, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<QuickPoolError>,
    {
        self.inner.lease.run(operation).await
    }

    /// 注册提交后步骤；任务本身不在事务中，因此立即执行
    pub async fn add_post_commit_step<F, Fut>(&self, step: F) -> QuickPoolResult<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = QuickPoolResult<()>> + Send + 'static,
    {
        step().await
    }

    /// 结束任务：回收事务锁并归还租约
    pub(crate) fn finish(self) {
        match Arc::try_unwrap(self.inner) {
            Ok(TaskInner { mut lease, tx_lock }) => {
                if let Err(e) = tx_lock.pool() {
                    debug!("任务事务锁未能回收: {}", e);
                }
                if let Err(e) = lease.release() {
                    debug!("任务结束时归还租约失败: {}", e);
                }
            }
            Err(_) => warn!("任务上下文仍被引用，租约将在最后一个引用释放时归还"),
        }
    }
}

impl<M> Task<M>
where
    M: ResourceManager,
    M::Resource: TransactionDriver,
{
    /// 在任务上执行事务
    ///
    /// 开启 BEGIN，执行 `f`，成功时 COMMIT 并按注册顺序执行提交后步骤；
    /// 失败时 ROLLBACK（回滚错误只记录日志）并返回原始错误。
    /// 开启了序列化冲突重试时，冲突会让 `f` 从 BEGIN 开始整体重新执行。
    pub async fn tx<F, T>(&self, mut f: F, options: TransactionOptions) -> QuickPoolResult<T>
    where
        F: for<'a> FnMut(&'a Transaction<M>) -> BoxFuture<'a, QuickPoolResult<T>>,
    {
        let body = &mut f;
        let options = &options;
        self.inner
            .tx_lock
            .with_lock(move || self.run_transaction(body, options))
            .await
    }

    async fn run_transaction<F, T>(
        &self,
        f: &mut F,
        options: &TransactionOptions,
    ) -> QuickPoolResult<T>
    where
        F: for<'a> FnMut(&'a Transaction<M>) -> BoxFuture<'a, QuickPoolResult<T>>,
    {
        let driver = self.resource();
        let mut retries: u32 = 0;
        loop {
            self.run(driver.begin_transaction(options)).await?;
            crate::debug_log!("事务开始: {}", options.begin_statement());

            let transaction = Transaction::new(self.share(), 1);
            let outcome = self.run(f(&transaction)).await;
            let error = match outcome {
                Ok(value) => match self.run(driver.commit()).await {
                    Ok(()) => {
                        let steps = transaction.take_steps();
                        if !steps.is_empty() {
                            debug!("事务已提交，执行 {} 个提交后步骤", steps.len());
                        }
                        for step in steps {
                            step().await?;
                        }
                        return Ok(value);
                    }
                    Err(e) => e,
                },
                Err(e) => e,
            };

            if let Err(rollback_error) = self.run(driver.rollback()).await {
                warn!("事务回滚失败，已忽略: {}", rollback_error);
            }

            if options.retry_serialization_failures && driver.is_serialization_conflict(&error) {
                if let Some(max) = options.max_serialization_retries {
                    if retries >= max {
                        warn!("序列化冲突重试次数已达上限 {}，放弃事务", max);
                        return Err(error);
                    }
                }
                retries += 1;
                info!("检测到序列化冲突，重新执行事务（第 {} 次重试）", retries);
                continue;
            }
            return Err(error);
        }
    }
}

impl<M: ResourceManager> Deref for Task<M> {
    type Target = M::Resource;

    fn deref(&self) -> &Self::Target {
        self.resource()
    }
}

impl<M: ResourceManager> std::fmt::Debug for Task<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("lease", &self.inner.lease)
            .finish()
    }
}

/// 事务上下文
pub struct Transaction<M: ResourceManager> {
    task: Task<M>,
    depth: usize,
    steps: Mutex<Vec<PostCommitStep>>,
}

impl<M: ResourceManager> Transaction<M> {
    fn new(task: Task<M>, depth: usize) -> Self {
        Self {
            task,
            depth,
            steps: Mutex::new(Vec::new()),
        }
    }

    fn take_steps(&self) -> Vec<PostCommitStep> {
        std::mem::take(&mut *self.steps.lock())
    }

    /// 嵌套深度，最外层为 1
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// 事务所在资源
    pub fn resource(&self) -> &M::Resource {
        self.task.resource()
    }

    /// 租约是否已被强制回收
    pub fn is_aborted(&self) -> bool {
        self.task.is_aborted()
    }

    /// 在租约上执行操作，租约被强制回收时返回 [`QuickPoolError::LeaseAborted`]
    pub async fn run<F, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<QuickPoolError>,
    {
        self.task.run(operation).await
    }

    /// 注册提交后步骤，在最外层 COMMIT 成功后、资源归还前按注册顺序执行
    pub fn add_post_commit_step<F, Fut>(&self, step: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = QuickPoolResult<()>> + Send + 'static,
    {
        self.steps.lock().push(Box::new(move || step().boxed()));
    }

    /// 嵌套事务：复用外层事务，不发出 BEGIN/COMMIT
    ///
    /// 成功时其提交后步骤并入外层；失败时这些步骤被丢弃，错误原样返回给外层。
    pub async fn tx<F, T>(&self, f: F) -> QuickPoolResult<T>
    where
        F: for<'a> FnOnce(&'a Transaction<M>) -> BoxFuture<'a, QuickPoolResult<T>>,
    {
        let nested = Transaction::new(self.task.share(), self.depth + 1);
        crate::debug_log!("进入嵌套事务，深度 {}", nested.depth);
        match self.run(f(&nested)).await {
            Ok(value) => {
                let steps = nested.take_steps();
                self.steps.lock().extend(steps);
                Ok(value)
            }
            Err(e) => {
                let discarded = nested.take_steps().len();
                if discarded > 0 {
                    debug!("嵌套事务失败，丢弃 {} 个提交后步骤", discarded);
                }
                Err(e)
            }
        }
    }
}

impl<M: ResourceManager> Deref for Transaction<M> {
    type Target = M::Resource;

    fn deref(&self) -> &Self::Target {
        self.resource()
    }
}

impl<M: ResourceManager> std::fmt::Debug for Transaction<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("depth", &self.depth)
            .field("pending_steps", &self.steps.lock().len())
            .finish()
    }
}

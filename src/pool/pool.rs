//! 资源池核心模块
//!
//! 容量上限内按需打开资源；空闲资源优先复用；容量用尽时调用方按 FIFO 排队，
//! 归还的资源直接交给最早的等待者。配置了归还时限时，每个租约带一个计时器，
//! 超时后强制关闭资源并腾出容量。

use parking_lot::Mutex;
use rat_logger::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Notify, oneshot};
use tokio::task::AbortHandle;
use tokio::time::Instant;

use super::lease::{Grant, Lease};
use super::types::{LeaseSignal, PoolStats, ResourceManager};
use super::PoolConfig;
use crate::error::{QuickPoolError, QuickPoolResult};
use crate::queue::Deque;
use crate::utils::runtime::spawn_detached;

/// 池中的一个资源及其使用次数
struct PooledResource<R> {
    resource: Arc<R>,
    uses: u32,
}

/// 借出中的资源
struct LoanEntry<R> {
    pooled: PooledResource<R>,
    signal: Arc<LeaseSignal>,
    timer: Option<AbortHandle>,
}

/// 空闲资源
struct IdleEntry<R> {
    pooled: PooledResource<R>,
    idle_since: Instant,
}

/// 排队等待资源的调用方
struct PoolWaiter<R> {
    resolver: oneshot::Sender<QuickPoolResult<Grant<R>>>,
}

struct PoolState<R> {
    on_loan: HashMap<u64, LoanEntry<R>>,
    idle: Vec<IdleEntry<R>>,
    waiters: Deque<PoolWaiter<R>>,
    opening: usize,
    closing: usize,
    draining: bool,
    next_id: u64,
}

impl<R> PoolState<R> {
    fn total(&self) -> usize {
        self.on_loan.len() + self.idle.len() + self.opening + self.closing
    }

    fn live_waiters(&self) -> usize {
        self.waiters
            .iter()
            .filter(|w| !w.resolver.is_closed())
            .count()
    }
}

struct PoolShared<M: ResourceManager> {
    manager: M,
    config: PoolConfig,
    state: Mutex<PoolState<M::Resource>>,
    /// 任何影响排空进度的状态变化都会通知
    changed: Notify,
}

/// 通用资源池
///
/// 句柄可以克隆，所有克隆共享同一个池。
pub struct ResourcePool<M: ResourceManager> {
    shared: Arc<PoolShared<M>>,
}

impl<M: ResourceManager> Clone for ResourcePool<M> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

enum Checkout<R> {
    Granted(Grant<R>),
    Queued(oneshot::Receiver<QuickPoolResult<Grant<R>>>),
}

impl<M: ResourceManager> ResourcePool<M> {
    /// 使用配置创建资源池
    pub fn new(manager: M, config: PoolConfig) -> QuickPoolResult<Self> {
        config.validate()?;
        info!(
            "创建资源池: 最大资源数={}, 归还时限={:?}ms, 排队时限={:?}ms",
            config.max_size, config.release_timeout_ms, config.queue_timeout_ms
        );
        Ok(Self {
            shared: Arc::new(PoolShared {
                manager,
                config,
                state: Mutex::new(PoolState {
                    on_loan: HashMap::new(),
                    idle: Vec::new(),
                    waiters: Deque::new(),
                    opening: 0,
                    closing: 0,
                    draining: false,
                    next_id: 0,
                }),
                changed: Notify::new(),
            }),
        })
    }

    /// 资源池配置
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// 资源管理器
    pub fn manager(&self) -> &M {
        &self.shared.manager
    }

    /// 租用一个资源
    ///
    /// 有空闲资源时立即返回；未达容量上限时打开新资源；否则排队等待归还。
    /// 排空开始后返回 [`QuickPoolError::PoolDraining`]。
    pub async fn get_connection(&self) -> QuickPoolResult<Lease<M>> {
        let (checkout, expired) = {
            let mut state = self.shared.state.lock();
            if state.draining {
                return Err(QuickPoolError::PoolDraining);
            }
            let expired = self.sweep_idle_locked(&mut state);
            let checkout = match state.idle.pop() {
                Some(entry) => Checkout::Granted(self.register_loan_locked(&mut state, entry.pooled)),
                None => {
                    let (tx, rx) = oneshot::channel();
                    state.waiters.push(PoolWaiter { resolver: tx });
                    self.fill_waiters_locked(&mut state);
                    Checkout::Queued(rx)
                }
            };
            (checkout, expired)
        };
        self.close_detached(expired);

        let rx = match checkout {
            Checkout::Granted(grant) => return Ok(Lease::new(self.clone(), grant)),
            Checkout::Queued(rx) => rx,
        };

        let mut pending = PendingLease {
            pool: self,
            rx,
            done: false,
        };
        let received = match self.shared.config.queue_timeout() {
            Some(limit) => match tokio::time::timeout(limit, &mut pending.rx).await {
                Ok(received) => received,
                Err(_) => {
                    let timeout_ms = limit.as_millis() as u64;
                    warn!("排队等待资源超时: {}ms", timeout_ms);
                    return Err(QuickPoolError::QueueTimedOut { timeout_ms });
                }
            },
            None => (&mut pending.rx).await,
        };
        pending.done = true;

        match received {
            Ok(Ok(grant)) => Ok(Lease::new(self.clone(), grant)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(QuickPoolError::PoolDraining),
        }
    }

    /// 排空资源池
    ///
    /// 拒绝排队中和之后的租用请求，等待所有租约归还或被强制回收，
    /// 关闭全部空闲资源。返回关闭过程中遇到的第一个错误。
    pub async fn drain(&self) -> QuickPoolResult<()> {
        let rejected = {
            let mut state = self.shared.state.lock();
            if state.draining {
                Vec::new()
            } else {
                state.draining = true;
                state.waiters.clear()
            }
        };
        info!("资源池开始排空，拒绝 {} 个排队请求", rejected.len());
        for waiter in rejected {
            let _ = waiter.resolver.send(Err(QuickPoolError::PoolDraining));
        }

        let mut first_error = None;
        loop {
            let notified = self.shared.changed.notified();
            let (idle, finished) = {
                let mut state = self.shared.state.lock();
                let idle = std::mem::take(&mut state.idle);
                state.closing += idle.len();
                let finished = idle.is_empty()
                    && state.on_loan.is_empty()
                    && state.opening == 0
                    && state.closing == 0;
                (idle, finished)
            };
            if finished {
                break;
            }
            if idle.is_empty() {
                notified.await;
                continue;
            }
            for entry in idle {
                if let Err(e) = self.shared.manager.close(&entry.pooled.resource).await {
                    error!("排空时关闭资源失败: {}", e);
                    first_error.get_or_insert(e);
                }
                self.shared.state.lock().closing -= 1;
            }
        }

        info!("资源池排空完成");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// 当前统计信息
    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock();
        PoolStats {
            max_size: self.shared.config.max_size,
            total: state.total(),
            idle: state.idle.len(),
            on_loan: state.on_loan.len(),
            waiting: state.live_waiters(),
            opening: state.opening,
            closing: state.closing,
            draining: state.draining,
        }
    }

    /// 归还租约（由 [`Lease::release`] 调用）
    pub(crate) fn check_in(&self, id: u64) {
        let to_close = {
            let mut state = self.shared.state.lock();
            let Some(entry) = state.on_loan.remove(&id) else {
                debug!("租约 {} 已被强制回收，忽略归还", id);
                return;
            };
            if let Some(timer) = entry.timer {
                timer.abort();
            }
            let pooled = entry.pooled;
            let mut to_close = self.sweep_idle_locked(&mut state);

            let worn_out = self
                .shared
                .config
                .max_uses
                .is_some_and(|max_uses| pooled.uses >= max_uses);
            if state.draining {
                state.idle.push(IdleEntry {
                    pooled,
                    idle_since: Instant::now(),
                });
            } else if worn_out {
                debug!("资源达到最大使用次数 {}，归还时关闭", pooled.uses);
                state.closing += 1;
                to_close.push(pooled);
            } else {
                self.hand_off_locked(&mut state, pooled);
            }
            to_close
        };
        self.close_detached(to_close);
        self.shared.changed.notify_waiters();
    }

    /// 关闭借出中的资源（由 [`Lease::dispose`] 调用）
    pub(crate) async fn dispose(&self, id: u64) -> QuickPoolResult<()> {
        let pooled = {
            let mut state = self.shared.state.lock();
            let Some(entry) = state.on_loan.remove(&id) else {
                return Ok(());
            };
            if let Some(timer) = entry.timer {
                timer.abort();
            }
            state.closing += 1;
            entry.pooled
        };
        debug!("租约 {} 的资源被丢弃并关闭", id);
        let result = self.shared.manager.close(&pooled.resource).await;
        self.finish_close();
        result
    }

    /// 租约超过归还时限：中断、关闭资源并腾出容量
    async fn evict(&self, id: u64) {
        let pooled = {
            let mut state = self.shared.state.lock();
            let Some(entry) = state.on_loan.remove(&id) else {
                return;
            };
            entry.signal.abort();
            state.closing += 1;
            entry.pooled
        };
        warn!(
            "租约 {} 超过归还时限 {:?}ms，强制回收资源",
            id, self.shared.config.release_timeout_ms
        );
        self.shared
            .manager
            .on_release_timeout_exceeded(&pooled.resource)
            .await;
        if let Err(e) = self.shared.manager.close(&pooled.resource).await {
            error!("强制关闭超时资源失败: {}", e);
        }
        self.finish_close();
    }

    fn register_loan_locked(
        &self,
        state: &mut PoolState<M::Resource>,
        mut pooled: PooledResource<M::Resource>,
    ) -> Grant<M::Resource> {
        state.next_id += 1;
        let id = state.next_id;
        pooled.uses += 1;
        let signal = Arc::new(LeaseSignal::default());
        let timer = self.shared.config.release_timeout().and_then(|limit| {
            let weak = Arc::downgrade(&self.shared);
            spawn_detached(async move {
                tokio::time::sleep(limit).await;
                if let Some(shared) = weak.upgrade() {
                    ResourcePool { shared }.evict(id).await;
                }
            })
        });
        let grant = Grant {
            id,
            resource: pooled.resource.clone(),
            signal: signal.clone(),
        };
        state.on_loan.insert(
            id,
            LoanEntry {
                pooled,
                signal,
                timer,
            },
        );
        grant
    }

    /// 把资源交给最早的等待者，没有等待者时放回空闲集合
    fn hand_off_locked(
        &self,
        state: &mut PoolState<M::Resource>,
        pooled: PooledResource<M::Resource>,
    ) {
        let mut pooled = pooled;
        while let Some(waiter) = state.waiters.shift() {
            if waiter.resolver.is_closed() {
                continue;
            }
            let grant = self.register_loan_locked(state, pooled);
            let id = grant.id;
            if waiter.resolver.send(Ok(grant)).is_ok() {
                return;
            }
            // 等待者恰好在交接时放弃，收回资源
            let Some(entry) = state.on_loan.remove(&id) else {
                return;
            };
            if let Some(timer) = entry.timer {
                timer.abort();
            }
            pooled = entry.pooled;
            pooled.uses -= 1;
        }
        state.idle.push(IdleEntry {
            pooled,
            idle_since: Instant::now(),
        });
    }

    /// 为排队中的调用方在容量范围内补开资源
    fn fill_waiters_locked(&self, state: &mut PoolState<M::Resource>) {
        if state.draining {
            return;
        }
        let live = state.live_waiters();
        let max_size = self.shared.config.max_size as usize;
        while live > state.opening && state.total() < max_size {
            state.opening += 1;
            if self.spawn_open().is_none() {
                state.opening -= 1;
                break;
            }
        }
    }

    fn spawn_open(&self) -> Option<AbortHandle> {
        let pool = self.clone();
        spawn_detached(async move {
            let result = pool.shared.manager.open().await;
            pool.finish_open(result);
        })
    }

    fn finish_open(&self, result: QuickPoolResult<M::Resource>) {
        {
            let mut state = self.shared.state.lock();
            state.opening -= 1;
            match result {
                Ok(resource) => {
                    let pooled = PooledResource {
                        resource: Arc::new(resource),
                        uses: 0,
                    };
                    if state.draining {
                        state.idle.push(IdleEntry {
                            pooled,
                            idle_since: Instant::now(),
                        });
                    } else {
                        debug!("新资源已打开，当前总数 {}", state.total() + 1);
                        self.hand_off_locked(&mut state, pooled);
                    }
                }
                Err(e) => {
                    error!("打开资源失败: {}", e);
                    // 错误交给最早的等待者
                    let mut failure = e;
                    while let Some(waiter) = state.waiters.shift() {
                        match waiter.resolver.send(Err(failure)) {
                            Ok(()) => break,
                            Err(Err(returned)) => failure = returned,
                            Err(Ok(_)) => break,
                        }
                    }
                    self.fill_waiters_locked(&mut state);
                }
            }
        }
        self.shared.changed.notify_waiters();
    }

    fn finish_close(&self) {
        {
            let mut state = self.shared.state.lock();
            state.closing -= 1;
            self.fill_waiters_locked(&mut state);
        }
        self.shared.changed.notify_waiters();
    }

    /// 移出超过空闲时限的资源，计入关闭中
    fn sweep_idle_locked(
        &self,
        state: &mut PoolState<M::Resource>,
    ) -> Vec<PooledResource<M::Resource>> {
        let Some(limit) = self.shared.config.idle_timeout() else {
            return Vec::new();
        };
        let now = Instant::now();
        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.idle)
            .into_iter()
            .partition(|entry| now.duration_since(entry.idle_since) >= limit);
        state.idle = kept;
        state.closing += expired.len();
        if !expired.is_empty() {
            debug!("关闭 {} 个超过空闲时限的资源", expired.len());
        }
        expired.into_iter().map(|entry| entry.pooled).collect()
    }

    /// 在后台关闭资源，关闭完成后腾出容量
    fn close_detached(&self, resources: Vec<PooledResource<M::Resource>>) {
        if resources.is_empty() {
            return;
        }
        let count = resources.len();
        let pool = self.clone();
        let spawned = spawn_detached(async move {
            for pooled in resources {
                if let Err(e) = pool.shared.manager.close(&pooled.resource).await {
                    warn!("关闭资源失败: {}", e);
                }
                pool.finish_close();
            }
        });
        if spawned.is_none() {
            let mut state = self.shared.state.lock();
            state.closing -= count;
        }
    }
}

impl<M: ResourceManager> std::fmt::Debug for ResourcePool<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePool")
            .field("config", &self.shared.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// 排队中的租用请求；若在资源交接后被取消，则立即归还该资源
struct PendingLease<'a, M: ResourceManager> {
    pool: &'a ResourcePool<M>,
    rx: oneshot::Receiver<QuickPoolResult<Grant<M::Resource>>>,
    done: bool,
}

impl<M: ResourceManager> Drop for PendingLease<'_, M> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        self.rx.close();
        if let Ok(Ok(grant)) = self.rx.try_recv() {
            debug!("租用请求已取消，归还刚交接的资源");
            drop(Lease::new(self.pool.clone(), grant));
        }
    }
}

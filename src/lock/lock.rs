//! 单持有者互斥锁
//!
//! 等待者按 FIFO 排队。配置了超时的锁只维护一个计时器，
//! 它始终对应队首等待者（只有队首才会是下一个拿到锁的人）。
//! 释放锁时取消旧计时器，再按新队首已经等待的时长补偿后重新计时。

use parking_lot::{Mutex, MutexGuard};
use rat_logger::{debug, warn};
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use super::LockPool;
use crate::error::{QuickPoolError, QuickPoolResult};
use crate::queue::Deque;
use crate::utils::runtime::spawn_detached;

/// 锁变为空闲（无持有者、无等待者）时的回调
pub type OnEmpty = Arc<dyn Fn(&Lock) + Send + Sync>;

struct LockWaiter {
    resolver: oneshot::Sender<QuickPoolResult<()>>,
    enqueued_at: Instant,
}

struct LockTimer {
    seq: u64,
    handle: AbortHandle,
}

struct LockState {
    /// 每次回收到空闲列表时递增，旧句柄随之失效
    generation: u64,
    active: bool,
    executing: bool,
    waiters: Deque<LockWaiter>,
    timeout: Option<Duration>,
    timer: Option<LockTimer>,
    timer_seq: u64,
    on_empty: Option<OnEmpty>,
}

impl LockState {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
        }
    }

    /// 丢掉已经放弃等待的等待者
    fn prune_waiters(&mut self) {
        if self.waiters.iter().all(|w| !w.resolver.is_closed()) {
            return;
        }
        let live: Vec<LockWaiter> = self
            .waiters
            .clear()
            .into_iter()
            .filter(|w| !w.resolver.is_closed())
            .collect();
        for waiter in live {
            self.waiters.push(waiter);
        }
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.map(|t| t.as_millis() as u64).unwrap_or_default()
    }
}

/// 锁实例本体，可在 [`LockPool`] 中复用
pub(crate) struct LockInner {
    state: Mutex<LockState>,
}

impl LockInner {
    pub(crate) fn new(timeout: Option<Duration>, on_empty: Option<OnEmpty>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(LockState {
                generation: 0,
                active: true,
                executing: false,
                waiters: Deque::new(),
                timeout,
                timer: None,
                timer_seq: 0,
                on_empty,
            }),
        })
    }

    /// 从空闲列表取出后重新激活，返回新的代数
    pub(crate) fn revive(&self, timeout: Option<Duration>, on_empty: Option<OnEmpty>) -> u64 {
        let mut state = self.state.lock();
        state.active = true;
        state.executing = false;
        state.timeout = timeout;
        state.on_empty = on_empty;
        state.generation
    }

    pub(crate) fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// 以队首等待者的入队时间为基准启动计时器
    fn arm_timer(self: &Arc<Self>, state: &mut LockState) {
        state.cancel_timer();
        let Some(timeout) = state.timeout else {
            return;
        };
        let Some(front) = state.waiters.peek() else {
            return;
        };
        let remaining = timeout.saturating_sub(front.enqueued_at.elapsed());
        state.timer_seq += 1;
        let seq = state.timer_seq;
        let weak: Weak<LockInner> = Arc::downgrade(self);
        let handle = spawn_detached(async move {
            tokio::time::sleep(remaining).await;
            if let Some(inner) = weak.upgrade() {
                inner.on_timer(seq);
            }
        });
        if let Some(handle) = handle {
            state.timer = Some(LockTimer { seq, handle });
        }
    }

    fn on_timer(self: &Arc<Self>, seq: u64) {
        let mut state = self.state.lock();
        match &state.timer {
            Some(timer) if timer.seq == seq => {}
            // 已被释放操作取消或替换
            _ => return,
        }
        state.timer = None;
        let Some(timeout) = state.timeout else {
            return;
        };

        let now = Instant::now();
        let timeout_ms = state.timeout_ms();
        while let Some(front) = state.waiters.peek() {
            if now.duration_since(front.enqueued_at) < timeout {
                break;
            }
            if let Some(waiter) = state.waiters.shift() {
                let _ = waiter
                    .resolver
                    .send(Err(QuickPoolError::LockTimedOut { timeout_ms }));
                warn!("等待锁超时，已拒绝队首等待者: timeout={}ms", timeout_ms);
            }
        }
        self.arm_timer(&mut state);
    }
}

/// 互斥锁句柄
///
/// 句柄可以克隆，所有克隆指向同一个锁实例。实例被 [`Lock::pool`] 回收后，
/// 旧句柄上的任何操作都会返回 [`QuickPoolError::LockInactive`]。
#[derive(Clone)]
pub struct Lock {
    inner: Arc<LockInner>,
    generation: u64,
    free_list: LockPool,
}

impl Lock {
    pub(crate) fn from_parts(inner: Arc<LockInner>, generation: u64, free_list: LockPool) -> Self {
        Self {
            inner,
            generation,
            free_list,
        }
    }

    fn state(&self) -> QuickPoolResult<MutexGuard<'_, LockState>> {
        let state = self.inner.state.lock();
        if !state.active || state.generation != self.generation {
            return Err(QuickPoolError::LockInactive);
        }
        Ok(state)
    }

    /// 获取锁
    ///
    /// 锁空闲时立即返回，不挂起；否则排队等待，超过配置的超时时间
    /// 返回 [`QuickPoolError::LockTimedOut`]。
    pub async fn acquire_lock(&self) -> QuickPoolResult<()> {
        let rx = {
            let mut state = self.state()?;
            if !state.executing {
                state.executing = true;
                return Ok(());
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push(LockWaiter {
                resolver: tx,
                enqueued_at: Instant::now(),
            });
            if state.timer.is_none() {
                self.inner.arm_timer(&mut state);
            }
            rx
        };

        let mut pending = PendingGrant {
            lock: self,
            rx,
            done: false,
        };
        let result = (&mut pending.rx).await;
        pending.done = true;
        result.unwrap_or(Err(QuickPoolError::LockInactive))
    }

    /// 获取锁后原样返回调用方给出的值
    pub async fn acquire_lock_with<T>(&self, payload: T) -> QuickPoolResult<T> {
        self.acquire_lock().await?;
        Ok(payload)
    }

    /// 释放锁
    ///
    /// 有等待者时直接把锁交给最早的等待者；否则标记为空闲并触发 `on_empty`。
    pub fn release_lock(&self) -> QuickPoolResult<()> {
        let on_empty = {
            let mut state = self.state()?;
            if !state.executing {
                return Err(QuickPoolError::LockNotHeld);
            }
            state.cancel_timer();

            let mut handed_over = false;
            while let Some(waiter) = state.waiters.shift() {
                if waiter.resolver.send(Ok(())).is_ok() {
                    handed_over = true;
                    break;
                }
            }

            if handed_over {
                self.inner.arm_timer(&mut state);
                None
            } else {
                state.executing = false;
                state.on_empty.clone()
            }
        };

        if let Some(on_empty) = on_empty {
            on_empty(self);
        }
        Ok(())
    }

    /// 在锁内执行 `f`，无论成功失败都会释放锁
    pub async fn with_lock<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<QuickPoolError>,
    {
        self.acquire_lock().await?;
        let _held = HeldLock { lock: self };
        f().await
    }

    /// 把锁实例回收到空闲列表
    ///
    /// 仅在没有持有者和等待者时合法，否则返回 [`QuickPoolError::LockInUse`]。
    pub fn pool(&self) -> QuickPoolResult<()> {
        {
            let mut state = self.state()?;
            state.prune_waiters();
            if state.executing || !state.waiters.is_empty() {
                return Err(QuickPoolError::LockInUse);
            }
            Self::retire_locked(&mut state);
        }
        self.free_list.put_back(self.inner.clone());
        debug!("锁实例已回收到空闲列表");
        Ok(())
    }

    /// 空闲时回收并返回 true，仍在使用时返回 false
    pub(crate) fn try_retire(&self) -> bool {
        {
            let Ok(mut state) = self.state() else {
                return false;
            };
            state.prune_waiters();
            if state.executing || !state.waiters.is_empty() {
                return false;
            }
            Self::retire_locked(&mut state);
        }
        self.free_list.put_back(self.inner.clone());
        true
    }

    fn retire_locked(state: &mut LockState) {
        state.cancel_timer();
        state.active = false;
        state.generation += 1;
        state.on_empty = None;
    }

    /// 是否指向同一个锁实例的同一代
    pub fn same_instance(&self, other: &Lock) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) && self.generation == other.generation
    }

    /// 句柄是否仍然有效
    pub fn is_active(&self) -> bool {
        self.state().is_ok()
    }

    /// 当前是否有持有者
    pub fn is_locked(&self) -> bool {
        self.state().map(|s| s.executing).unwrap_or(false)
    }

    /// 正在等待的调用方个数
    pub fn waiting_count(&self) -> usize {
        self.state()
            .map(|s| s.waiters.iter().filter(|w| !w.resolver.is_closed()).count())
            .unwrap_or(0)
    }

    /// 配置的获取超时
    pub fn timeout(&self) -> Option<Duration> {
        self.state().ok().and_then(|s| s.timeout)
    }
}

impl std::fmt::Debug for Lock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lock")
            .field("generation", &self.generation)
            .field("active", &self.is_active())
            .field("locked", &self.is_locked())
            .field("waiting", &self.waiting_count())
            .finish()
    }
}

/// `with_lock` 期间持有锁，离开作用域（包括被取消）时释放
pub(crate) struct HeldLock<'a> {
    pub(crate) lock: &'a Lock,
}

impl Drop for HeldLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.release_lock() {
            warn!("释放锁失败: {}", e);
        }
    }
}

/// 排队中的获取请求；若在已被授予锁之后取消，则把锁交还
struct PendingGrant<'a> {
    lock: &'a Lock,
    rx: oneshot::Receiver<QuickPoolResult<()>>,
    done: bool,
}

impl Drop for PendingGrant<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        self.rx.close();
        if let Ok(Ok(())) = self.rx.try_recv() {
            debug!("获取锁的调用已取消，归还刚授予的锁");
            let _ = self.lock.release_lock();
        }
    }
}

//! 按键互斥锁
//!
//! 每个键首次使用时从空闲列表取一把锁放入存储；当这把锁既无持有者也无等待者时，
//! 从存储中移除并回收到空闲列表。不同键之间互不阻塞。

use dashmap::DashMap;
use rat_logger::debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::Duration;

use super::lock::HeldLock;
use super::{Lock, LockPool, OnEmpty};
use crate::error::{QuickPoolError, QuickPoolResult};

/// 键到锁的存储，可替换为自定义实现
pub trait LockStore<K>: Send + Sync {
    /// 查找键对应的锁
    fn get(&self, key: &K) -> Option<Lock>;

    /// 查找键对应的锁，不存在时用 `create` 创建并插入
    fn get_or_insert_with(&self, key: K, create: &mut dyn FnMut() -> Lock) -> Lock;

    /// 在存储内部的临界区中判断并移除，返回是否移除
    fn remove_if(&self, key: &K, predicate: &mut dyn FnMut(&Lock) -> bool) -> bool;

    /// 当前存储的键个数
    fn len(&self) -> usize;

    /// 是否为空
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 基于 DashMap 的默认存储
pub struct DashMapLockStore<K> {
    map: DashMap<K, Lock>,
}

impl<K: Eq + Hash> DashMapLockStore<K> {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }
}

impl<K: Eq + Hash> Default for DashMapLockStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> LockStore<K> for DashMapLockStore<K>
where
    K: Eq + Hash + Send + Sync,
{
    fn get(&self, key: &K) -> Option<Lock> {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    fn get_or_insert_with(&self, key: K, create: &mut dyn FnMut() -> Lock) -> Lock {
        self.map.entry(key).or_insert_with(|| create()).value().clone()
    }

    fn remove_if(&self, key: &K, predicate: &mut dyn FnMut(&Lock) -> bool) -> bool {
        self.map.remove_if(key, |_, lock| predicate(lock)).is_some()
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// 按键管理的一组互斥锁
pub struct KeyedLocks<K> {
    store: Arc<dyn LockStore<K>>,
    timeout: Option<Duration>,
    locks: LockPool,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// 使用默认的 DashMap 存储
    pub fn new(locks: LockPool, timeout: Option<Duration>) -> Self {
        Self::with_store(Arc::new(DashMapLockStore::new()), locks, timeout)
    }

    /// 使用自定义存储
    pub fn with_store(
        store: Arc<dyn LockStore<K>>,
        locks: LockPool,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            store,
            timeout,
            locks,
        }
    }

    fn lock_for(&self, key: &K) -> Lock {
        let store: Weak<dyn LockStore<K>> = Arc::downgrade(&self.store);
        let locks = &self.locks;
        let timeout = self.timeout;
        let hook_key = key.clone();
        self.store.get_or_insert_with(key.clone(), &mut || {
            let store = store.clone();
            let key = hook_key.clone();
            let on_empty: OnEmpty = Arc::new(move |lock: &Lock| {
                let Some(store) = store.upgrade() else {
                    return;
                };
                let removed = store.remove_if(&key, &mut |candidate| {
                    candidate.same_instance(lock) && candidate.try_retire()
                });
                if removed {
                    debug!("按键锁已空闲，移出存储并回收");
                }
            });
            locks.create_lock_with_on_empty(timeout, Some(on_empty))
        })
    }

    async fn acquire_handle(&self, key: &K) -> QuickPoolResult<Lock> {
        loop {
            let lock = self.lock_for(key);
            match lock.acquire_lock().await {
                Ok(()) => return Ok(lock),
                // 查找与获取之间这把锁被回收了，换一把重新来
                Err(QuickPoolError::LockInactive) => {
                    self.store
                        .remove_if(key, &mut |candidate| candidate.same_instance(&lock));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 获取键对应的锁
    pub async fn acquire_lock(&self, key: &K) -> QuickPoolResult<()> {
        self.acquire_handle(key).await.map(|_| ())
    }

    /// 获取键对应的锁后原样返回 `payload`
    pub async fn acquire_lock_with<T>(&self, key: &K, payload: T) -> QuickPoolResult<T> {
        self.acquire_handle(key).await?;
        Ok(payload)
    }

    /// 释放键对应的锁
    pub fn release_lock(&self, key: &K) -> QuickPoolResult<()> {
        match self.store.get(key) {
            Some(lock) => lock.release_lock(),
            None => Err(QuickPoolError::LockNotHeld),
        }
    }

    /// 在键对应的锁内执行 `f`
    pub async fn with_lock<F, Fut, T, E>(&self, key: &K, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<QuickPoolError>,
    {
        let lock = self.acquire_handle(key).await?;
        let _held = HeldLock { lock: &lock };
        f().await
    }

    /// 当前有活动的键个数
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// 没有任何活动的键
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// 键是否有持有者或等待者
    pub fn contains_key(&self, key: &K) -> bool {
        self.store.get(key).is_some()
    }
}

//! 测试共用的模拟资源管理器与事务驱动

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rat_quickpool::{
    quick_error, QuickPoolResult, ResourceManager, TransactionDriver, TransactionOptions,
};

/// 所有连接共享的观测数据
#[derive(Default)]
pub struct MockStats {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
    pub timeouts: AtomicUsize,
    pub fail_next_open: AtomicBool,
    pub fail_rollback: AtomicBool,
    pub fail_next_close: AtomicBool,
    /// 剩余的序列化冲突次数，COMMIT 时消耗
    pub pending_conflicts: AtomicUsize,
    /// 执行过的语句
    pub log: Mutex<Vec<String>>,
}

impl MockStats {
    pub fn statements(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    fn record(&self, statement: impl Into<String>) {
        self.log.lock().push(statement.into());
    }
}

/// 模拟连接
#[derive(Debug)]
pub struct MockConnection {
    pub id: usize,
    stats: Arc<MockStats>,
}

impl MockConnection {
    /// 模拟执行一条语句
    pub async fn execute(&self, sql: &str) -> QuickPoolResult<()> {
        self.stats.record(sql);
        tokio::task::yield_now().await;
        Ok(())
    }
}

impl std::fmt::Debug for MockStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStats")
            .field("opened", &self.opened.load(Ordering::SeqCst))
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

#[async_trait]
impl TransactionDriver for MockConnection {
    async fn begin_transaction(&self, options: &TransactionOptions) -> QuickPoolResult<()> {
        self.stats.record(options.begin_statement());
        Ok(())
    }

    async fn commit(&self) -> QuickPoolResult<()> {
        tokio::task::yield_now().await;
        let conflict = self
            .stats
            .pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if conflict {
            self.stats.record("COMMIT (conflict)");
            return Err(quick_error!(driver, "40001", "could not serialize access"));
        }
        self.stats.record("COMMIT");
        Ok(())
    }

    async fn rollback(&self) -> QuickPoolResult<()> {
        self.stats.record("ROLLBACK");
        if self.stats.fail_rollback.load(Ordering::SeqCst) {
            return Err(quick_error!(driver, "connection reset"));
        }
        Ok(())
    }
}

/// 模拟资源管理器
#[derive(Clone, Default)]
pub struct MockManager {
    pub stats: Arc<MockStats>,
}

impl MockManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> usize {
        self.stats.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.stats.closed.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.stats.max_live.load(Ordering::SeqCst)
    }

    pub fn timeouts(&self) -> usize {
        self.stats.timeouts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceManager for MockManager {
    type Resource = MockConnection;

    async fn open(&self) -> QuickPoolResult<MockConnection> {
        tokio::task::yield_now().await;
        if self.stats.fail_next_open.swap(false, Ordering::SeqCst) {
            return Err(quick_error!(resource, "connection refused"));
        }
        let id = self.stats.opened.fetch_add(1, Ordering::SeqCst) + 1;
        let live = self.stats.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_live.fetch_max(live, Ordering::SeqCst);
        Ok(MockConnection {
            id,
            stats: self.stats.clone(),
        })
    }

    async fn close(&self, _resource: &MockConnection) -> QuickPoolResult<()> {
        if self.stats.fail_next_close.swap(false, Ordering::SeqCst) {
            self.stats.live.fetch_sub(1, Ordering::SeqCst);
            return Err(quick_error!(resource, "close failed"));
        }
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        self.stats.live.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_release_timeout_exceeded(&self, _resource: &MockConnection) {
        self.stats.timeouts.fetch_add(1, Ordering::SeqCst);
    }
}

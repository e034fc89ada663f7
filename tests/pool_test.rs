mod common;

#[cfg(test)]
mod tests {
    use super::common::MockManager;
    use proptest::prelude::*;
    use rat_quickpool::{create_resource_pool, PoolConfig, QuickPoolError, ResourcePool};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready, task};

    fn config(max_size: u32) -> PoolConfig {
        PoolConfig::builder()
            .max_size(max_size)
            .no_release_timeout()
            .no_queue_timeout()
            .no_idle_timeout()
            .unlimited_uses()
            .build()
            .expect("配置构建失败")
    }

    fn pool(manager: &MockManager, config: PoolConfig) -> ResourcePool<MockManager> {
        create_resource_pool(manager.clone(), config).expect("创建资源池失败")
    }

    /// 让后台的打开/关闭任务跑完
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_and_hand_off() {
        println!("🔍 测试资源池容量与直接交接");
        let manager = MockManager::new();
        let pool = pool(&manager, config(2));

        let mut first = pool.get_connection().await.unwrap();
        let second = pool.get_connection().await.unwrap();
        let mut third = task::spawn(pool.get_connection());
        assert_pending!(third.poll());
        settle().await;
        assert_pending!(third.poll());

        let stats = pool.stats();
        assert_eq!(stats.on_loan, 2);
        assert_eq!(stats.waiting, 1);
        assert_eq!(stats.total, 2);

        let first_id = first.resource().id;
        first.release().unwrap();
        let third = assert_ready!(third.poll()).unwrap();
        // 归还的资源直接交给等待者，没有新开资源
        assert_eq!(third.resource().id, first_id);
        assert_eq!(manager.opened(), 2);
        assert_eq!(pool.stats().idle, 0);

        drop(second);
        drop(third);
        assert_eq!(pool.stats().idle, 2);
        assert_eq!(pool.stats().on_loan, 0);
        println!("✅ 容量限制与交接正确");
    }

    #[tokio::test]
    async fn test_idle_resource_is_reused() {
        let manager = MockManager::new();
        let pool = pool(&manager, config(4));

        let mut lease = pool.get_connection().await.unwrap();
        let id = lease.resource().id;
        lease.release().unwrap();
        assert!(matches!(lease.release(), Err(QuickPoolError::LeaseAlreadyReleased)));

        let again = pool.get_connection().await.unwrap();
        assert_eq!(again.resource().id, id);
        assert_eq!(manager.opened(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_timeout_aborts_lease() {
        println!("🔍 测试租约超时强制回收");
        let manager = MockManager::new();
        let config = PoolConfig::builder()
            .max_size(1)
            .release_timeout_ms(50)
            .no_queue_timeout()
            .no_idle_timeout()
            .unlimited_uses()
            .build()
            .unwrap();
        let pool = pool(&manager, config);

        let mut lease = pool.get_connection().await.unwrap();
        let result: Result<(), QuickPoolError> = lease
            .run(async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            })
            .await;
        let err = result.expect_err("租约应被强制回收");
        assert!(matches!(err, QuickPoolError::LeaseAborted));
        assert!(err.to_string().contains("Transaction aborted"));
        assert!(lease.is_aborted());

        settle().await;
        assert_eq!(manager.timeouts(), 1);
        assert_eq!(manager.closed(), 1);
        assert_eq!(pool.stats().total, 0);

        // 已回收的租约再归还是无害的
        lease.release().unwrap();
        let fresh = pool.get_connection().await.unwrap();
        assert_eq!(fresh.resource().id, 2);
        println!("✅ 超时租约已回收，容量已释放");
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_serves_queued_waiter() {
        let manager = MockManager::new();
        let config = PoolConfig::builder()
            .max_size(1)
            .release_timeout_ms(30)
            .no_queue_timeout()
            .no_idle_timeout()
            .unlimited_uses()
            .build()
            .unwrap();
        let pool = pool(&manager, config);

        let _stuck = pool.get_connection().await.unwrap();
        let waiter = pool.get_connection().await.unwrap();
        assert_eq!(waiter.resource().id, 2);
        assert_eq!(manager.timeouts(), 1);
        assert_eq!(manager.max_live(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_timeout() {
        let manager = MockManager::new();
        let config = PoolConfig::builder()
            .max_size(1)
            .no_release_timeout()
            .queue_timeout_ms(30)
            .no_idle_timeout()
            .unlimited_uses()
            .build()
            .unwrap();
        let pool = pool(&manager, config);

        let _held = pool.get_connection().await.unwrap();
        let err = pool.get_connection().await.expect_err("排队应超时");
        assert!(matches!(err, QuickPoolError::QueueTimedOut { timeout_ms: 30 }));
        assert!(err.is_timeout());
        assert_eq!(pool.stats().waiting, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_uses_retires_resource() {
        let manager = MockManager::new();
        let config = PoolConfig::builder()
            .max_size(1)
            .no_release_timeout()
            .no_queue_timeout()
            .no_idle_timeout()
            .max_uses(2)
            .build()
            .unwrap();
        let pool = pool(&manager, config);

        for _ in 0..2 {
            let lease = pool.get_connection().await.unwrap();
            assert_eq!(lease.resource().id, 1);
        }
        settle().await;
        assert_eq!(manager.closed(), 1);

        let lease = pool.get_connection().await.unwrap();
        assert_eq!(lease.resource().id, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_timeout_sweeps_old_resources() {
        let manager = MockManager::new();
        let config = PoolConfig::builder()
            .max_size(2)
            .no_release_timeout()
            .no_queue_timeout()
            .idle_timeout_ms(100)
            .unlimited_uses()
            .build()
            .unwrap();
        let pool = pool(&manager, config);

        drop(pool.get_connection().await.unwrap());
        tokio::time::sleep(Duration::from_millis(150)).await;
        let lease = pool.get_connection().await.unwrap();
        assert_eq!(lease.resource().id, 2);
        settle().await;
        assert_eq!(manager.closed(), 1);
    }

    #[tokio::test]
    async fn test_open_failure_propagates() {
        let manager = MockManager::new();
        manager.stats.fail_next_open.store(true, Ordering::SeqCst);
        let pool = pool(&manager, config(1));

        let err = pool.get_connection().await.expect_err("打开失败应传给调用方");
        assert!(matches!(err, QuickPoolError::ResourceError { .. }));
        assert_eq!(pool.stats().total, 0);

        let lease = pool.get_connection().await.unwrap();
        assert_eq!(lease.resource().id, 1);
    }

    #[tokio::test]
    async fn test_dispose_closes_resource() {
        let manager = MockManager::new();
        let pool = pool(&manager, config(1));

        let lease = pool.get_connection().await.unwrap();
        lease.dispose().await.unwrap();
        assert_eq!(manager.closed(), 1);
        assert_eq!(pool.stats().total, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain() {
        println!("🔍 测试资源池排空");
        let manager = MockManager::new();
        let pool = pool(&manager, config(1));

        let held = pool.get_connection().await.unwrap();
        let queued = tokio::spawn({
            let pool = pool.clone();
            async move { pool.get_connection().await.map(|lease| lease.resource().id) }
        });
        settle().await;
        assert_eq!(pool.stats().waiting, 1);

        let draining = tokio::spawn({
            let pool = pool.clone();
            async move { pool.drain().await }
        });
        settle().await;

        let rejected = queued.await.unwrap();
        assert!(matches!(rejected, Err(QuickPoolError::PoolDraining)));
        assert!(matches!(
            pool.get_connection().await,
            Err(QuickPoolError::PoolDraining)
        ));
        assert!(!draining.is_finished());

        drop(held);
        draining.await.unwrap().expect("排空失败");
        assert_eq!(manager.closed(), 1);
        assert_eq!(pool.stats().total, 0);
        println!("✅ 排空完成");
    }

    #[tokio::test]
    async fn test_drain_closes_idle_resources() {
        let manager = MockManager::new();
        let pool = pool(&manager, config(3));

        let first = pool.get_connection().await.unwrap();
        let second = pool.get_connection().await.unwrap();
        drop(first);
        drop(second);
        assert_eq!(pool.stats().idle, 2);

        pool.drain().await.expect("排空失败");
        assert_eq!(manager.closed(), 2);
        let stats = pool.stats();
        assert_eq!(stats.idle, 0);
        assert_eq!(stats.total, 0);
        assert!(stats.draining);
    }

    #[tokio::test]
    async fn test_drain_reports_first_close_error() {
        let manager = MockManager::new();
        let pool = pool(&manager, config(2));

        let first = pool.get_connection().await.unwrap();
        let second = pool.get_connection().await.unwrap();
        drop(first);
        drop(second);
        manager.stats.fail_next_close.store(true, Ordering::SeqCst);

        let err = pool.drain().await.expect_err("关闭失败应当返回给调用方");
        assert!(matches!(err, QuickPoolError::ResourceError { .. }));
        assert!(err.to_string().contains("close failed"));
        // 失败之后其余资源仍然被关闭
        assert_eq!(manager.closed(), 1);
        assert_eq!(pool.stats().total, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_finishes_when_loan_is_evicted() {
        let manager = MockManager::new();
        let config = PoolConfig::builder()
            .max_size(1)
            .release_timeout_ms(40)
            .no_queue_timeout()
            .no_idle_timeout()
            .unlimited_uses()
            .build()
            .unwrap();
        let pool = pool(&manager, config);

        let lease = pool.get_connection().await.unwrap();
        let draining = tokio::spawn({
            let pool = pool.clone();
            async move { pool.drain().await }
        });
        settle().await;
        assert!(!draining.is_finished());

        // 租约未归还，超过时限后被强制回收，排空随之完成
        draining.await.unwrap().expect("排空失败");
        assert!(lease.is_aborted());
        assert_eq!(manager.timeouts(), 1);
        assert_eq!(manager.closed(), 1);
        assert_eq!(pool.stats().total, 0);
        drop(lease);
        assert_eq!(manager.closed(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// 任意并发租用/归还下同时打开的资源数不超过上限
        #[test]
        fn pool_never_exceeds_max_size(
            max_size in 1u32..4,
            holds in prop::collection::vec(0u64..20, 1..24),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .start_paused(true)
                .build()
                .unwrap();
            let manager = MockManager::new();
            let pool = pool(&manager, config(max_size));

            runtime.block_on(async {
                let mut handles = Vec::new();
                for hold in holds {
                    let pool = pool.clone();
                    handles.push(tokio::spawn(async move {
                        let lease = pool.get_connection().await.unwrap();
                        let stats = pool.stats();
                        assert!(stats.total <= stats.max_size as usize);
                        tokio::time::sleep(Duration::from_millis(hold)).await;
                        drop(lease);
                    }));
                }
                for handle in handles {
                    handle.await.unwrap();
                }
            });

            prop_assert!(manager.max_live() <= max_size as usize);
            let stats = pool.stats();
            prop_assert_eq!(stats.on_loan, 0);
            prop_assert_eq!(stats.waiting, 0);
            prop_assert!(stats.total <= max_size as usize);
        }
    }
}

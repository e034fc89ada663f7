#[cfg(test)]
mod tests {
    use rat_quickpool::{create_locks_by_key, LockPool, QuickPoolError};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready, task};

    #[tokio::test]
    async fn test_keys_do_not_block_each_other() {
        println!("🔍 测试不同键之间互不阻塞");
        let locks = LockPool::new();
        let keyed = create_locks_by_key::<String>(&locks, None);
        let a = "a".to_string();
        let b = "b".to_string();

        keyed.acquire_lock(&a).await.unwrap();
        let mut queued_a = task::spawn(keyed.acquire_lock(&a));
        assert_pending!(queued_a.poll());

        let mut acquire_b = task::spawn(keyed.acquire_lock(&b));
        assert!(assert_ready!(acquire_b.poll()).is_ok());
        assert_eq!(keyed.len(), 2);

        keyed.release_lock(&b).unwrap();
        assert!(!keyed.contains_key(&b));
        keyed.release_lock(&a).unwrap();
        assert!(assert_ready!(queued_a.poll()).is_ok());
        assert!(keyed.contains_key(&a));
        println!("✅ 键之间相互独立");
    }

    #[tokio::test]
    async fn test_fully_released_key_is_removed_and_recycled() {
        let locks = LockPool::new();
        let keyed = create_locks_by_key::<u32>(&locks, Some(1_000));

        keyed.acquire_lock(&7).await.unwrap();
        assert!(keyed.contains_key(&7));
        keyed.release_lock(&7).unwrap();
        assert!(keyed.is_empty());
        assert_eq!(locks.free_count(), 1);

        // 再次获取立即成功，并复用回收的实例
        let mut again = task::spawn(keyed.acquire_lock(&7));
        assert!(assert_ready!(again.poll()).is_ok());
        assert_eq!(locks.free_count(), 0);
        keyed.release_lock(&7).unwrap();

        assert!(matches!(keyed.release_lock(&7), Err(QuickPoolError::LockNotHeld)));
    }

    #[tokio::test]
    async fn test_acquire_with_payload() {
        let locks = LockPool::new();
        let keyed = create_locks_by_key::<&'static str>(&locks, None);
        let payload = keyed.acquire_lock_with(&"user:1", vec![1, 2, 3]).await.unwrap();
        assert_eq!(payload, vec![1, 2, 3]);
        keyed.release_lock(&"user:1").unwrap();
        assert!(keyed.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_with_lock_serializes_same_key() {
        let locks = LockPool::new();
        let keyed = Arc::new(create_locks_by_key::<u8>(&locks, None));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..32u8 {
            let keyed = keyed.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();
            handles.push(tokio::spawn(async move {
                keyed
                    .with_lock(&(i % 2), || async {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(1)).await;
                        inside.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, QuickPoolError>(())
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // 两个键，最多两个任务同时在锁内
        assert!(max_inside.load(Ordering::SeqCst) <= 2);
        assert!(keyed.is_empty());
    }
}

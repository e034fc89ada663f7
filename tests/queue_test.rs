#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rat_quickpool::{AsyncQueue, Deque};
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tokio_test::{assert_pending, assert_ready, task};

    #[derive(Debug, Clone)]
    enum Op {
        Push(u32),
        Shift,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![any::<u32>().prop_map(Op::Push), Just(Op::Shift)]
    }

    proptest! {
        /// 任意推入/取出交错下，shift 总是返回最早推入且未被取出的值
        #[test]
        fn deque_is_fifo(ops in prop::collection::vec(op_strategy(), 0..200)) {
            let mut deque = Deque::new();
            let mut model = VecDeque::new();
            for op in ops {
                match op {
                    Op::Push(v) => {
                        deque.push(v);
                        model.push_back(v);
                    }
                    Op::Shift => prop_assert_eq!(deque.shift(), model.pop_front()),
                }
                prop_assert_eq!(deque.len(), model.len());
                prop_assert_eq!(deque.peek(), model.front());
            }
            let rest = deque.clear();
            prop_assert_eq!(rest, model.into_iter().collect::<Vec<_>>());
            prop_assert_eq!(deque.len(), 0);
        }
    }

    #[test]
    fn test_deque_unshift_goes_to_front() {
        let mut deque: Deque<i32> = [2, 3].into_iter().collect();
        deque.unshift(1);
        assert_eq!(deque.shift(), Some(1));
        assert_eq!(deque.clear(), vec![2, 3]);
        assert!(deque.is_empty());
    }

    #[tokio::test]
    async fn test_async_queue_pairing() {
        println!("🔍 测试异步队列推入/取出配对");
        let queue = AsyncQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push(3);
        assert_eq!(queue.shift().await, 1);
        queue.push(4);
        assert_eq!(queue.shift().await, 2);
        assert_eq!(queue.shift().await, 3);
        assert_eq!(queue.shift().await, 4);
        assert_eq!(queue.len(), 0);
        println!("✅ 配对顺序正确");
    }

    #[tokio::test]
    async fn test_pending_shift_receives_next_push() {
        let queue = Arc::new(AsyncQueue::new());
        let mut first = task::spawn(queue.shift());
        let mut second = task::spawn(queue.shift());
        assert_pending!(first.poll());
        assert_pending!(second.poll());
        assert_eq!(queue.len(), -2);

        queue.push("a");
        assert!(first.is_woken());
        assert_eq!(assert_ready!(first.poll()), "a");
        assert_eq!(queue.len(), -1);

        queue.push("b");
        assert_eq!(assert_ready!(second.poll()), "b");
        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_shift_does_not_lose_values() {
        let queue = AsyncQueue::new();
        {
            let mut abandoned = task::spawn(queue.shift());
            assert_pending!(abandoned.poll());
        }
        assert_eq!(queue.len(), 0);

        queue.push(5);
        assert_eq!(queue.try_shift(), Some(5));

        // 值已经交出但消费方在取走前被取消
        let mut granted = task::spawn(queue.shift());
        assert_pending!(granted.poll());
        queue.push(6);
        drop(granted);
        queue.push(7);
        assert_eq!(queue.shift().await, 6);
        assert_eq!(queue.shift().await, 7);
    }
}

//! 异步阻塞队列
//!
//! 生产者 `push` 永不挂起；消费者 `shift` 在没有缓冲值时挂起，
//! 直到后续的 `push` 把值直接交给它。推入与等待严格按 FIFO 配对。

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::Deque;

struct QueueState<T> {
    /// 已缓冲、尚未被取走的值
    items: Deque<T>,
    /// 正在等待的消费者
    waiters: Deque<oneshot::Sender<T>>,
}

/// 异步 FIFO 队列
///
/// 任意时刻 `items` 与 `waiters` 至多一个非空。
pub struct AsyncQueue<T> {
    state: Mutex<QueueState<T>>,
}

impl<T> AsyncQueue<T> {
    /// 创建空队列
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: Deque::new(),
                waiters: Deque::new(),
            }),
        }
    }

    /// 缓冲值个数减去等待中的消费者个数，可以为负
    pub fn len(&self) -> isize {
        let state = self.state.lock();
        let waiting = state.waiters.iter().filter(|tx| !tx.is_closed()).count();
        state.items.len() as isize - waiting as isize
    }

    /// 既没有缓冲值也没有等待者
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 推入一个值：交给最早的等待者，没有等待者时缓冲
    pub fn push(&self, value: T) {
        let mut state = self.state.lock();
        let mut value = value;
        while let Some(waiter) = state.waiters.shift() {
            match waiter.send(value) {
                Ok(()) => return,
                // 等待者已被取消，交给下一个
                Err(returned) => value = returned,
            }
        }
        state.items.push(value);
    }

    /// 不挂起地取出一个缓冲值
    pub fn try_shift(&self) -> Option<T> {
        self.state.lock().items.shift()
    }

    /// 取出一个值，没有缓冲值时等待下一次 `push`
    pub async fn shift(&self) -> T {
        loop {
            let rx = {
                let mut state = self.state.lock();
                if let Some(value) = state.items.shift() {
                    return value;
                }
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                rx
            };

            let mut pending = PendingShift {
                queue: self,
                rx,
                done: false,
            };
            let received = (&mut pending.rx).await;
            pending.done = true;
            if let Ok(value) = received {
                return value;
            }
        }
    }

    /// 把已经交出的值还给队首（优先交给下一个等待者）
    fn give_back(&self, value: T) {
        let mut state = self.state.lock();
        let mut value = value;
        while let Some(waiter) = state.waiters.shift() {
            match waiter.send(value) {
                Ok(()) => return,
                Err(returned) => value = returned,
            }
        }
        state.items.unshift(value);
    }
}

impl<T> Default for AsyncQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for AsyncQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncQueue")
            .field("len", &self.len())
            .finish()
    }
}

/// 等待中的 `shift`；被取消时把已经收到的值还回队列
struct PendingShift<'a, T> {
    queue: &'a AsyncQueue<T>,
    rx: oneshot::Receiver<T>,
    done: bool,
}

impl<T> Drop for PendingShift<'_, T> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        self.rx.close();
        if let Ok(value) = self.rx.try_recv() {
            self.queue.give_back(value);
        }
    }
}

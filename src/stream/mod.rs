//! 推送转拉取的流适配模块
//!
//! 生产者通过 [`PushSink`] 推送数据，消费者以 [`futures::Stream`] 的方式拉取。
//! 未消费的缓冲数达到高水位后再推送数据时暂停生产者，缓冲数回落到高水位以下时恢复。

use futures::future::BoxFuture;
use futures::{FutureExt, Stream};
use parking_lot::Mutex;
use rat_logger::debug;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::queue::AsyncQueue;

/// 被适配的推送式数据源
///
/// 这些方法在适配器内部的互斥区内调用，实现中不能同步回调 [`PushSink`]。
pub trait PushSource: Send + 'static {
    /// 暂停生产
    fn pause(&mut self);

    /// 恢复生产
    fn resume(&mut self);

    /// 消费方提前结束，释放数据源
    fn dispose(&mut self);

    /// 高水位：允许缓冲的未消费条目数
    fn high_water_mark(&self) -> usize;
}

enum PushEvent<T, E> {
    Data(T),
    Error(E),
    End,
}

struct Control {
    source: Option<Box<dyn PushSource>>,
    high_water_mark: usize,
    paused: bool,
    /// 已收到结束或错误，之后的推送被忽略
    finished: bool,
    disposed: bool,
}

struct StreamShared<T, E> {
    queue: AsyncQueue<PushEvent<T, E>>,
    control: Mutex<Control>,
}

impl<T, E> StreamShared<T, E> {
    fn buffered(&self) -> usize {
        self.queue.len().max(0) as usize
    }
}

/// 交给生产者的推送端，可以克隆
pub struct PushSink<T, E> {
    shared: Arc<StreamShared<T, E>>,
}

impl<T, E> Clone for PushSink<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> PushSink<T, E> {
    /// 推送一条数据
    pub fn data(&self, value: T) {
        let mut control = self.shared.control.lock();
        if control.finished {
            return;
        }
        let buffered = self.shared.buffered();
        let high_water_mark = control.high_water_mark;
        if !control.paused && buffered >= high_water_mark {
            control.paused = true;
            if let Some(source) = control.source.as_mut() {
                debug!("缓冲达到高水位 {}，暂停数据源", high_water_mark);
                source.pause();
            }
        }
        self.shared.queue.push(PushEvent::Data(value));
    }

    /// 推送错误，流在产出该错误后结束
    pub fn error(&self, error: E) {
        let mut control = self.shared.control.lock();
        if control.finished {
            return;
        }
        control.finished = true;
        self.shared.queue.push(PushEvent::Error(error));
    }

    /// 数据源正常结束
    pub fn end(&self) {
        let mut control = self.shared.control.lock();
        if control.finished {
            return;
        }
        control.finished = true;
        self.shared.queue.push(PushEvent::End);
    }
}

/// 拉取端
///
/// 依次产出 `Ok(数据)`；数据源报错时产出一次 `Err` 后结束。
/// 在结束前被丢弃或调用 [`PushStream::close`] 会释放数据源。
pub struct PushStream<T, E> {
    shared: Arc<StreamShared<T, E>>,
    pending: Option<BoxFuture<'static, PushEvent<T, E>>>,
    done: bool,
}

impl<T, E> PushStream<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// 提前结束并释放数据源
    pub fn close(&mut self) {
        self.pending = None;
        if self.done {
            return;
        }
        self.done = true;
        let mut control = self.shared.control.lock();
        if control.disposed {
            return;
        }
        control.disposed = true;
        control.finished = true;
        if let Some(source) = control.source.as_mut() {
            debug!("消费方提前结束，释放数据源");
            source.dispose();
        }
    }

    /// 当前已缓冲但尚未消费的条目数
    pub fn buffered(&self) -> usize {
        self.shared.buffered()
    }

    /// 数据源当前是否处于暂停状态
    pub fn is_paused(&self) -> bool {
        self.shared.control.lock().paused
    }

    fn after_consume(&self) {
        let mut control = self.shared.control.lock();
        if control.paused && self.shared.buffered() < control.high_water_mark {
            control.paused = false;
            if let Some(source) = control.source.as_mut() {
                debug!("缓冲回落到高水位以下，恢复数据源");
                source.resume();
            }
        }
    }
}

impl<T, E> Stream for PushStream<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        let future = this.pending.get_or_insert_with(|| {
            let shared = this.shared.clone();
            async move { shared.queue.shift().await }.boxed()
        });
        let event = futures::ready!(future.poll_unpin(cx));
        this.pending = None;

        match event {
            PushEvent::Data(value) => {
                this.after_consume();
                Poll::Ready(Some(Ok(value)))
            }
            PushEvent::Error(error) => {
                this.done = true;
                Poll::Ready(Some(Err(error)))
            }
            PushEvent::End => {
                this.done = true;
                Poll::Ready(None)
            }
        }
    }
}

impl<T, E> Drop for PushStream<T, E> {
    fn drop(&mut self) {
        self.pending = None;
        if self.done {
            return;
        }
        let mut control = self.shared.control.lock();
        if !control.disposed {
            control.disposed = true;
            control.finished = true;
            if let Some(source) = control.source.as_mut() {
                debug!("流在结束前被丢弃，释放数据源");
                source.dispose();
            }
        }
    }
}

/// 把推送式数据源适配为拉取式的流
///
/// `factory` 拿到推送端后启动生产，并返回用于流控的 [`PushSource`]。
pub fn push_to_stream<T, E, S, F>(factory: F) -> PushStream<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    S: PushSource,
    F: FnOnce(PushSink<T, E>) -> S,
{
    let shared = Arc::new(StreamShared {
        queue: AsyncQueue::new(),
        control: Mutex::new(Control {
            source: None,
            high_water_mark: usize::MAX,
            paused: false,
            finished: false,
            disposed: false,
        }),
    });

    let source = factory(PushSink {
        shared: shared.clone(),
    });

    {
        let mut control = shared.control.lock();
        let mut source: Box<dyn PushSource> = Box::new(source);
        control.high_water_mark = source.high_water_mark();
        // 工厂函数内同步推送的数据可能已经超过高水位
        if shared.buffered() > control.high_water_mark {
            control.paused = true;
            source.pause();
        }
        control.source = Some(source);
    }

    PushStream {
        shared,
        pending: None,
        done: false,
    }
}

//! 队列模块
//!
//! `Deque` 是所有排队逻辑的基础结构；`AsyncQueue` 在其上连接生产者与等待中的消费者

pub mod deque;
pub mod async_queue;

pub use deque::Deque;
pub use async_queue::AsyncQueue;

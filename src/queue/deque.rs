//! 双栈 FIFO 队列
//!
//! 逻辑顺序为 `reverse(head) ++ tail`：`push` 追加到 `tail`，
//! `shift` 从 `head` 弹出，`head` 为空时把 `tail` 整体倒入 `head`。
//! 每个操作均摊 O(1)。本结构不做任何并发保护，调用方负责在锁内使用。

use std::fmt;

/// 双栈实现的 FIFO 队列
pub struct Deque<T> {
    head: Vec<T>,
    tail: Vec<T>,
}

impl<T> Deque<T> {
    /// 创建空队列
    pub fn new() -> Self {
        Self {
            head: Vec::new(),
            tail: Vec::new(),
        }
    }

    /// 追加到队尾
    pub fn push(&mut self, value: T) {
        self.tail.push(value);
    }

    /// 放回队首
    ///
    /// 用于把已经交给消费者、但消费者随即被取消的值还回去
    pub fn unshift(&mut self, value: T) {
        self.head.push(value);
    }

    /// 取出队首元素
    pub fn shift(&mut self) -> Option<T> {
        if self.head.is_empty() {
            self.refill_head();
        }
        self.head.pop()
    }

    /// 查看队首元素，不修改队列
    pub fn peek(&self) -> Option<&T> {
        match self.head.last() {
            Some(value) => Some(value),
            None => self.tail.first(),
        }
    }

    /// 当前元素个数
    pub fn len(&self) -> usize {
        self.head.len() + self.tail.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.tail.is_empty()
    }

    /// 按 FIFO 顺序取出全部元素，队列随后为空
    pub fn clear(&mut self) -> Vec<T> {
        let mut items = std::mem::take(&mut self.head);
        items.reverse();
        items.append(&mut self.tail);
        items
    }

    /// 按 FIFO 顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.head.iter().rev().chain(self.tail.iter())
    }

    fn refill_head(&mut self) {
        self.head = std::mem::take(&mut self.tail);
        self.head.reverse();
    }
}

impl<T> Default for Deque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Deque<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> FromIterator<T> for Deque<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            head: Vec::new(),
            tail: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_keeps_push_order() {
        let mut queue = Deque::new();
        queue.push(1);
        queue.push(2);
        assert_eq!(queue.shift(), Some(1));
        queue.push(3);
        assert_eq!(queue.peek(), Some(&2));
        assert_eq!(queue.shift(), Some(2));
        assert_eq!(queue.shift(), Some(3));
        assert_eq!(queue.shift(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_peek_does_not_mutate() {
        let mut queue = Deque::new();
        assert_eq!(queue.peek(), None);
        queue.push("a");
        queue.push("b");
        assert_eq!(queue.peek(), Some(&"a"));
        assert_eq!(queue.peek(), Some(&"a"));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_clear_returns_remaining_in_order() {
        let mut queue: Deque<i32> = (1..=3).collect();
        assert_eq!(queue.shift(), Some(1));
        queue.push(4);
        queue.push(5);
        assert_eq!(queue.clear(), vec![2, 3, 4, 5]);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.shift(), None);
    }

    #[test]
    fn test_unshift_goes_to_front() {
        let mut queue = Deque::new();
        queue.push(2);
        queue.push(3);
        queue.unshift(1);
        assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(queue.shift(), Some(1));
        assert_eq!(queue.shift(), Some(2));
    }
}

//! The `Queue` trait and its FIFO/LIFO implementations.

use std::collections::VecDeque;

/// An ordered in-memory container with queue-shaped access.
///
/// Implementations decide the removal order: [`FifoQueue`] pops the oldest
/// element, [`Stack`] the newest, and
/// [`PriorityQueue`](super::PriorityQueue) the smallest according to its
/// comparator. The trait is object-safe so callers can swap the ordering
/// behind a `Box<dyn Queue<T>>` (the blocking queue does exactly that).
pub trait Queue<T> {
    /// Add an element.
    fn push(&mut self, item: T);
    /// Remove and return the next element, or `None` when empty.
    fn pop(&mut self) -> Option<T>;
    /// Borrow the next element without removing it.
    fn peek(&self) -> Option<&T>;
    /// Number of buffered elements.
    fn len(&self) -> usize;
    /// Whether the container is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Drop all buffered elements.
    fn clear(&mut self);
}

/// First-in, first-out queue backed by a ring buffer.
#[derive(Debug, Default)]
pub struct FifoQueue<T> {
    items: VecDeque<T>,
}

impl<T> FifoQueue<T> {
    /// Create an empty FIFO queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }
}

impl<T> Queue<T> for FifoQueue<T> {
    fn push(&mut self, item: T) {
        self.items.push_back(item);
    }

    fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}

/// Last-in, first-out stack exposed through the same `Queue` trait.
#[derive(Debug, Default)]
pub struct Stack<T> {
    items: Vec<T>,
}

impl<T> Stack<T> {
    /// Create an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Queue<T> for Stack<T> {
    fn push(&mut self, item: T) {
        self.items.push(item);
    }

    fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}

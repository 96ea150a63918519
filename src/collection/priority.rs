//! Comparator-ordered binary min-heap.

use super::queue::Queue;

/// Comparator returning `true` when `a` should be removed before `b`.
type Comparator<T> = Box<dyn Fn(&T, &T) -> bool + Send>;

/// Binary min-heap ordered by a caller-supplied comparator.
///
/// `std::collections::BinaryHeap` requires `T: Ord`; this variant instead
/// takes a closure at construction, which lets callers order elements by a
/// single field (the timer scheduler orders entries by trigger instant).
/// The heap order is not a total order: elements the comparator treats as
/// equal are popped in arbitrary relative order.
pub struct PriorityQueue<T> {
    items: Vec<T>,
    before: Comparator<T>,
}

impl<T> PriorityQueue<T> {
    /// Create an empty heap. `before(a, b)` must return `true` when `a`
    /// sorts ahead of `b`.
    pub fn new(before: impl Fn(&T, &T) -> bool + Send + 'static) -> Self {
        Self {
            items: Vec::new(),
            before: Box::new(before),
        }
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if (self.before)(&self.items[idx], &self.items[parent]) {
                self.items.swap(idx, parent);
                idx = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * idx + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut next = left;
            if right < len && (self.before)(&self.items[right], &self.items[left]) {
                next = right;
            }
            if (self.before)(&self.items[next], &self.items[idx]) {
                self.items.swap(next, idx);
                idx = next;
            } else {
                break;
            }
        }
    }
}

impl<T> Queue<T> for PriorityQueue<T> {
    fn push(&mut self, item: T) {
        self.items.push(item);
        self.sift_up(self.items.len() - 1);
    }

    fn pop(&mut self) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }
        let last = self.items.len() - 1;
        self.items.swap(0, last);
        let item = self.items.pop();
        if !self.items.is_empty() {
            self.sift_down(0);
        }
        item
    }

    fn peek(&self) -> Option<&T> {
        self.items.first()
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T> std::fmt::Debug for PriorityQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityQueue")
            .field("len", &self.items.len())
            .finish()
    }
}

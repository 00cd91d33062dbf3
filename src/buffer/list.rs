//! Doubly linked recency list stored in an arena of slots.
//!
//! Links are slot indices, so nodes never own each other. Freed slots are
//! recycled through a free list, which keeps `push_front`, `remove`,
//! `move_to_front` and `pop_back` O(1) with no per-node allocation once the
//! arena has grown to the working-set size.

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
pub(super) struct RecencyList<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    front: Option<usize>,
    back: Option<usize>,
    len: usize,
}

impl<T> RecencyList<T> {
    pub(super) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            front: None,
            back: None,
            len: 0,
        }
    }

    pub(super) const fn len(&self) -> usize {
        self.len
    }

    pub(super) fn get(&self, idx: usize) -> Option<&T> {
        self.node(idx).map(|node| &node.value)
    }

    pub(super) fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.node_mut(idx).map(|node| &mut node.value)
    }

    /// Inserts `value` as the most recently touched element and returns its slot.
    pub(super) fn push_front(&mut self, value: T) -> usize {
        let node = Node {
            value,
            prev: None,
            next: None,
        };
        let idx = self.free.pop().unwrap_or_else(|| {
            self.slots.push(None);
            self.slots.len().saturating_sub(1)
        });
        if let Some(slot) = self.slots.get_mut(idx) {
            *slot = Some(node);
        }
        self.link_front(idx);
        self.len = self.len.saturating_add(1);
        idx
    }

    pub(super) fn remove(&mut self, idx: usize) -> Option<T> {
        self.unlink(idx)?;
        let node = self.slots.get_mut(idx)?.take()?;
        self.free.push(idx);
        self.len = self.len.saturating_sub(1);
        Some(node.value)
    }

    pub(super) fn pop_back(&mut self) -> Option<T> {
        let idx = self.back?;
        self.remove(idx)
    }

    pub(super) fn move_to_front(&mut self, idx: usize) {
        if self.front == Some(idx) {
            return;
        }
        if self.unlink(idx).is_some() {
            self.link_front(idx);
        }
    }

    pub(super) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.front = None;
        self.back = None;
        self.len = 0;
    }

    /// Values from most to least recently touched.
    pub(super) fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let mut cursor = self.front;
        std::iter::from_fn(move || {
            let node = self.node(cursor?)?;
            cursor = node.next;
            Some(&node.value)
        })
    }

    fn node(&self, idx: usize) -> Option<&Node<T>> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, idx: usize) -> Option<&mut Node<T>> {
        self.slots.get_mut(idx).and_then(Option::as_mut)
    }

    fn link_front(&mut self, idx: usize) {
        let old_front = self.front;
        if let Some(node) = self.node_mut(idx) {
            node.prev = None;
            node.next = old_front;
        }
        if let Some(front) = old_front
            && let Some(node) = self.node_mut(front)
        {
            node.prev = Some(idx);
        }
        if old_front.is_none() {
            self.back = Some(idx);
        }
        self.front = Some(idx);
    }

    fn unlink(&mut self, idx: usize) -> Option<()> {
        let (prev, next) = {
            let node = self.node(idx)?;
            (node.prev, node.next)
        };
        match prev {
            Some(prev) => self.node_mut(prev)?.next = next,
            None => self.front = next,
        }
        match next {
            Some(next) => self.node_mut(next)?.prev = prev,
            None => self.back = prev,
        }
        let node = self.node_mut(idx)?;
        node.prev = None;
        node.next = None;
        Some(())
    }
}

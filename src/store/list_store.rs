//! List storage plus the per-key FIFO queue of blocked BLPOP clients.
//!
//! The whole store sits behind one async mutex, so every method here runs
//! inside a single critical section. That is what makes
//! [`ListStore::pop_for_waiter`] atomic: a waiter and the list head are
//! paired under the same lock, which guarantees an element is delivered to
//! exactly one client and a client receives exactly one element.

use std::collections::{HashMap, VecDeque};

use tokio::sync::oneshot;

/// A client suspended in BLPOP, identified by its peer address. The wake
/// path sends the popped element through `sender`; the connection task owns
/// the receiving end and encodes its own reply.
#[derive(Debug)]
pub struct ListWaiter {
    pub client_id: String,
    pub sender: oneshot::Sender<String>,
}

#[derive(Debug, Default)]
pub struct ListStore {
    lists: HashMap<String, VecDeque<String>>,
    waiters: HashMap<String, VecDeque<ListWaiter>>,
}

impl ListStore {
    pub fn new() -> Self {
        ListStore {
            lists: HashMap::new(),
            waiters: HashMap::new(),
        }
    }

    /// Appends elements to the tail. Returns the new length.
    pub fn rpush(&mut self, key: &str, elements: Vec<String>) -> usize {
        let list = self.lists.entry(key.to_string()).or_default();
        for element in elements {
            list.push_back(element);
        }
        list.len()
    }

    /// Inserts elements at the head, one at a time in argument order, so
    /// `LPUSH k a b` leaves the list as `[b, a, ...]`. Returns the new
    /// length.
    pub fn lpush(&mut self, key: &str, elements: Vec<String>) -> usize {
        let list = self.lists.entry(key.to_string()).or_default();
        for element in elements {
            list.push_front(element);
        }
        list.len()
    }

    /// Removes up to `count` elements from the head. An emptied list is
    /// deleted so empty lists are never observable.
    pub fn lpop(&mut self, key: &str, count: usize) -> Vec<String> {
        let Some(list) = self.lists.get_mut(key) else {
            return Vec::new();
        };

        let take = count.min(list.len());
        let popped = list.drain(..take).collect();

        if list.is_empty() {
            self.lists.remove(key);
        }

        popped
    }

    /// Inclusive range with Redis index semantics: negative indices count
    /// from the end, out-of-range bounds clamp, and `start > end` yields
    /// the empty sequence.
    pub fn lrange(&self, key: &str, start: i64, end: i64) -> Vec<String> {
        let Some(list) = self.lists.get(key) else {
            return Vec::new();
        };

        let length = list.len() as i64;
        let start = normalize_index(start, length);
        let end = normalize_index(end, length);

        if start >= length || start > end {
            return Vec::new();
        }

        let end = end.min(length - 1);

        list.iter()
            .skip(start as usize)
            .take((end - start + 1) as usize)
            .cloned()
            .collect()
    }

    pub fn llen(&self, key: &str) -> usize {
        self.lists.get(key).map_or(0, |list| list.len())
    }

    pub fn exists(&self, key: &str) -> bool {
        self.lists.contains_key(key)
    }

    /// Queues `waiter` behind any earlier waiters on `key`. Returns false
    /// without queueing when the list is non-empty; the caller should pop
    /// immediately instead of blocking.
    pub fn block_waiter(&mut self, key: &str, waiter: ListWaiter) -> bool {
        if self.lists.get(key).is_some_and(|list| !list.is_empty()) {
            return false;
        }

        self.waiters.entry(key.to_string()).or_default().push_back(waiter);
        true
    }

    /// Removes a still-queued waiter. Returns whether it was present; a
    /// false return means the wake path already claimed it, and with it the
    /// right to reply.
    pub fn unblock_waiter(&mut self, key: &str, client_id: &str) -> bool {
        let Some(queue) = self.waiters.get_mut(key) else {
            return false;
        };

        let before = queue.len();
        queue.retain(|waiter| waiter.client_id != client_id);
        let removed = queue.len() < before;

        if queue.is_empty() {
            self.waiters.remove(key);
        }

        removed
    }

    /// Pairs the oldest waiter on `key` with the head element, removing
    /// both, but only when both exist. Deletes emptied structures.
    pub fn pop_for_waiter(&mut self, key: &str) -> Option<(ListWaiter, String)> {
        let has_waiter = self.waiters.get(key).is_some_and(|queue| !queue.is_empty());
        let has_element = self.lists.get(key).is_some_and(|list| !list.is_empty());

        if !has_waiter || !has_element {
            return None;
        }

        let queue = self.waiters.get_mut(key)?;
        let waiter = queue.pop_front()?;
        if queue.is_empty() {
            self.waiters.remove(key);
        }

        let list = self.lists.get_mut(key)?;
        let element = list.pop_front()?;
        if list.is_empty() {
            self.lists.remove(key);
        }

        Some((waiter, element))
    }

    /// Puts an element back at the head after a failed delivery (the
    /// waiter's connection went away between pop and send).
    pub fn requeue_front(&mut self, key: &str, element: String) {
        self.lists.entry(key.to_string()).or_default().push_front(element);
    }
}

fn normalize_index(index: i64, length: i64) -> i64 {
    if index < 0 {
        (length + index).max(0)
    } else {
        index
    }
}

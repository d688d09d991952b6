//! In-process conversation state.
//!
//! Threads are keyed by `ThreadId`, created lazily, and append-only. There
//! is no deletion, no eviction, and no durable storage: state lives for the
//! process lifetime. Independent thread ids never share messages.

use plantline_core::message::{Message, Thread, ThreadId};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Keyed store of conversation threads.
pub struct ThreadStore {
    threads: Mutex<HashMap<ThreadId, Thread>>,
}

impl ThreadStore {
    pub fn new() -> Self {
        Self {
            threads: Mutex::new(HashMap::new()),
        }
    }

    /// Ensure a thread exists for the given id, creating an empty one on
    /// first use.
    pub fn get_or_create(&self, id: &ThreadId) {
        let mut threads = self.lock();
        if !threads.contains_key(id) {
            debug!(thread = %id, "Creating thread");
            threads.insert(id.clone(), Thread::new(id.clone()));
        }
    }

    /// Append a message to a thread, creating the thread if needed.
    ///
    /// The thread assigns the message its sequence position; existing
    /// entries are never reordered or modified.
    pub fn append(&self, id: &ThreadId, message: Message) {
        let mut threads = self.lock();
        threads
            .entry(id.clone())
            .or_insert_with(|| Thread::new(id.clone()))
            .append(message);
    }

    /// An ordered copy of a thread's messages; empty if the thread does not
    /// exist yet.
    pub fn snapshot(&self, id: &ThreadId) -> Vec<Message> {
        self.lock()
            .get(id)
            .map(|t| t.messages.clone())
            .unwrap_or_default()
    }

    /// Number of messages currently in a thread.
    pub fn len(&self, id: &ThreadId) -> usize {
        self.lock().get(id).map(Thread::len).unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ThreadId, Thread>> {
        // A poisoned lock means another answer cycle panicked; the map
        // itself is still valid (appends are single operations).
        self.threads.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ThreadStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lazy_creation_on_first_use() {
        let store = ThreadStore::new();
        let id = ThreadId::from("t1");
        assert_eq!(store.snapshot(&id).len(), 0);

        store.get_or_create(&id);
        assert_eq!(store.len(&id), 0);
    }

    #[test]
    fn append_assigns_sequence_in_order() {
        let store = ThreadStore::new();
        let id = ThreadId::from("t1");
        store.append(&id, Message::user("one"));
        store.append(&id, Message::assistant("two"));

        let messages = store.snapshot(&id);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].seq, 0);
        assert_eq!(messages[1].seq, 1);
        assert_eq!(messages[1].content, "two");
    }

    #[test]
    fn threads_are_isolated() {
        let store = ThreadStore::new();
        let a = ThreadId::from("shift-a");
        let b = ThreadId::from("shift-b");

        store.append(&a, Message::user("question about line 1"));
        store.append(&b, Message::user("question about line 2"));
        store.append(&a, Message::assistant("answer for line 1"));

        let a_msgs = store.snapshot(&a);
        let b_msgs = store.snapshot(&b);
        assert_eq!(a_msgs.len(), 2);
        assert_eq!(b_msgs.len(), 1);
        assert!(b_msgs[0].content.contains("line 2"));
        assert!(a_msgs.iter().all(|m| !m.content.contains("line 2")));
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let store = ThreadStore::new();
        let id = ThreadId::from("t1");
        store.append(&id, Message::user("hello"));
        store.get_or_create(&id);
        assert_eq!(store.len(&id), 1);
    }

    #[test]
    fn concurrent_appends_from_many_threads() {
        use std::sync::Arc;

        let store = Arc::new(ThreadStore::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                let id = ThreadId::from(&format!("t{i}"));
                for j in 0..10 {
                    store.append(&id, Message::user(format!("msg {j}")));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        for i in 0..8 {
            let id = ThreadId::from(&format!("t{i}"));
            let messages = store.snapshot(&id);
            assert_eq!(messages.len(), 10);
            let seqs: Vec<u64> = messages.iter().map(|m| m.seq).collect();
            assert_eq!(seqs, (0..10).collect::<Vec<u64>>());
        }
    }
}

//! Keyed result mailbox
//!
//! Background workers answer on a channel; the owning thread drains it once
//! per frame. Every result is tagged with a key (a position FEN, an analysis
//! generation) and only the entry for the *current* key is ever visible.
//!
//! # Retention
//!
//! - [`Retention::CurrentOnly`]: results for any other key are dropped on
//!   drain and the table is emptied whenever the current key changes. Used
//!   for engine evaluations, where only the newest generation matters.
//! - [`Retention::Unbounded`]: every result is kept so that scrubbing back
//!   to an earlier key shows its result without asking again. Used for
//!   opening suggestions.

use std::collections::HashMap;
use std::hash::Hash;

use crossbeam_channel::{unbounded, Receiver, Sender};

/// How results for non-current keys are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    CurrentOnly,
    Unbounded,
}

/// Outcome of a single drain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Results stored into the table
    pub merged: usize,
    /// Results dropped because their key was not current
    pub discarded: usize,
    /// The visible result differs from before the drain
    pub visibility_changed: bool,
}

impl DrainReport {
    /// Anything a renderer should redraw for
    pub fn touched(&self) -> bool {
        self.merged > 0 || self.visibility_changed
    }
}

pub struct KeyedMailbox<K, V> {
    sender: Sender<(K, V)>,
    inbox: Receiver<(K, V)>,
    table: HashMap<K, V>,
    current: Option<K>,
    visible: Option<V>,
    retention: Retention,
}

impl<K, V> KeyedMailbox<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
{
    pub fn new(retention: Retention) -> Self {
        let (sender, inbox) = unbounded();
        Self {
            sender,
            inbox,
            table: HashMap::new(),
            current: None,
            visible: None,
            retention,
        }
    }

    /// Sending half for worker threads
    pub fn sender(&self) -> Sender<(K, V)> {
        self.sender.clone()
    }

    /// Queue a result from the owning thread
    pub fn post(&self, key: K, value: V) {
        // The receiver lives in `self`, so the channel cannot be disconnected.
        let _ = self.sender.send((key, value));
    }

    /// Switch the current key
    ///
    /// Returns true when the visible result changed as a consequence.
    pub fn set_current(&mut self, key: K) -> bool {
        if self.current.as_ref() == Some(&key) {
            return false;
        }
        if self.retention == Retention::CurrentOnly {
            self.table.clear();
        }
        self.current = Some(key);
        self.resolve_visible()
    }

    pub fn current(&self) -> Option<&K> {
        self.current.as_ref()
    }

    /// Merge everything queued since the last drain
    pub fn drain(&mut self) -> DrainReport {
        let mut report = DrainReport::default();
        for (key, value) in self.inbox.try_iter() {
            let accepted = match self.retention {
                Retention::Unbounded => true,
                Retention::CurrentOnly => self.current.as_ref() == Some(&key),
            };
            if accepted {
                self.table.insert(key, value);
                report.merged += 1;
            } else {
                report.discarded += 1;
            }
        }
        report.visibility_changed = self.resolve_visible();
        report
    }

    /// Result for the current key
    pub fn visible(&self) -> Option<&V> {
        self.visible.as_ref()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.table.get(key)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Drop queued and stored results; the current key is kept
    pub fn clear(&mut self) {
        for _ in self.inbox.try_iter() {}
        self.table.clear();
        self.visible = None;
    }

    fn resolve_visible(&mut self) -> bool {
        let next = self
            .current
            .as_ref()
            .and_then(|key| self.table.get(key))
            .cloned();
        if next != self.visible {
            self.visible = next;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Unbounded
    // ========================================================================

    #[test]
    fn test_unbounded_keeps_results_for_other_keys() {
        //! A result for a key that is not current is stored, not shown
        let mut mailbox: KeyedMailbox<String, u32> = KeyedMailbox::new(Retention::Unbounded);
        mailbox.set_current("a".to_string());
        mailbox.post("b".to_string(), 7);

        let report = mailbox.drain();
        assert_eq!(report.merged, 1);
        assert!(!report.visibility_changed);
        assert!(mailbox.visible().is_none());

        assert!(mailbox.set_current("b".to_string()));
        assert_eq!(mailbox.visible(), Some(&7));
    }

    #[test]
    fn test_later_result_wins_within_one_drain() {
        let mut mailbox: KeyedMailbox<String, u32> = KeyedMailbox::new(Retention::Unbounded);
        mailbox.set_current("a".to_string());
        mailbox.post("a".to_string(), 1);
        mailbox.post("a".to_string(), 2);

        let report = mailbox.drain();
        assert_eq!(report.merged, 2);
        assert!(report.visibility_changed);
        assert_eq!(mailbox.visible(), Some(&2));
    }

    #[test]
    fn test_results_from_worker_thread() {
        let mut mailbox: KeyedMailbox<u64, u64> = KeyedMailbox::new(Retention::Unbounded);
        mailbox.set_current(3);
        let sender = mailbox.sender();
        std::thread::spawn(move || {
            for key in 0..5u64 {
                sender.send((key, key * 10)).unwrap();
            }
        })
        .join()
        .unwrap();

        let report = mailbox.drain();
        assert_eq!(report.merged, 5);
        assert_eq!(mailbox.visible(), Some(&30));
        assert_eq!(mailbox.len(), 5);
    }

    // ========================================================================
    // CurrentOnly
    // ========================================================================

    #[test]
    fn test_current_only_discards_stale_keys() {
        //! A response tagged with an old generation never becomes visible
        let mut mailbox: KeyedMailbox<u64, &str> = KeyedMailbox::new(Retention::CurrentOnly);
        mailbox.set_current(1);
        mailbox.set_current(2);
        mailbox.post(1, "stale");

        let report = mailbox.drain();
        assert_eq!(report.discarded, 1);
        assert_eq!(report.merged, 0);
        assert!(!report.touched());
        assert!(mailbox.visible().is_none());

        mailbox.post(2, "fresh");
        assert!(mailbox.drain().visibility_changed);
        assert_eq!(mailbox.visible(), Some(&"fresh"));
    }

    #[test]
    fn test_current_only_forgets_on_key_change() {
        let mut mailbox: KeyedMailbox<u64, &str> = KeyedMailbox::new(Retention::CurrentOnly);
        mailbox.set_current(1);
        mailbox.post(1, "one");
        mailbox.drain();

        assert!(mailbox.set_current(2), "visible result should disappear");
        assert!(mailbox.is_empty());
        assert!(!mailbox.set_current(2), "same key is a no-op");
    }

    #[test]
    fn test_clear_drops_queued_results() {
        let mut mailbox: KeyedMailbox<String, u32> = KeyedMailbox::new(Retention::Unbounded);
        mailbox.set_current("a".to_string());
        mailbox.post("a".to_string(), 1);
        mailbox.drain();
        mailbox.post("a".to_string(), 2);

        mailbox.clear();
        assert!(mailbox.visible().is_none());
        assert_eq!(mailbox.drain(), DrainReport::default());
        assert_eq!(mailbox.current(), Some(&"a".to_string()));
    }
}

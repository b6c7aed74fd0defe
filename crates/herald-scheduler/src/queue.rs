//! In-memory priority ordering of next-due instants.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

/// Min-ordered wake queue over `(due instant, insertion seq)`.
///
/// Ties at the same instant pop in insertion order, which keeps fire order
/// deterministic within a single process run. The id index makes replacing
/// or removing a job's entry O(log n) without scanning.
#[derive(Debug, Default)]
pub struct WakeQueue {
    entries: BTreeMap<(DateTime<Utc>, u64), String>,
    by_id: HashMap<String, (DateTime<Utc>, u64)>,
    seq: u64,
}

impl WakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or move `id` to `due`. An existing entry for the same id is
    /// replaced, never duplicated.
    pub fn insert(&mut self, id: &str, due: DateTime<Utc>) {
        if let Some(old_key) = self.by_id.remove(id) {
            self.entries.remove(&old_key);
        }
        let key = (due, self.seq);
        self.seq += 1;
        self.entries.insert(key, id.to_string());
        self.by_id.insert(id.to_string(), key);
    }

    /// Unlink `id`'s entry, if present.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.by_id.remove(id) {
            Some(key) => {
                self.entries.remove(&key);
                true
            }
            None => false,
        }
    }

    /// Earliest due instant and its job id.
    pub fn peek(&self) -> Option<(DateTime<Utc>, &str)> {
        self.entries
            .iter()
            .next()
            .map(|((due, _), id)| (*due, id.as_str()))
    }

    /// Remove and return the earliest entry.
    pub fn pop(&mut self) -> Option<(DateTime<Utc>, String)> {
        let (key, id) = {
            let (key, id) = self.entries.iter().next()?;
            (*key, id.clone())
        };
        self.entries.remove(&key);
        self.by_id.remove(&id);
        Some((key.0, id))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_id.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn pops_in_due_order() {
        let now = Utc::now();
        let mut q = WakeQueue::new();
        q.insert("late", now + Duration::minutes(10));
        q.insert("early", now + Duration::minutes(1));
        q.insert("mid", now + Duration::minutes(5));

        assert_eq!(q.pop().map(|(_, id)| id).as_deref(), Some("early"));
        assert_eq!(q.pop().map(|(_, id)| id).as_deref(), Some("mid"));
        assert_eq!(q.pop().map(|(_, id)| id).as_deref(), Some("late"));
        assert!(q.pop().is_none());
    }

    #[test]
    fn same_instant_pops_in_insertion_order() {
        let due = Utc::now() + Duration::minutes(1);
        let mut q = WakeQueue::new();
        q.insert("first", due);
        q.insert("second", due);
        q.insert("third", due);

        assert_eq!(q.pop().map(|(_, id)| id).as_deref(), Some("first"));
        assert_eq!(q.pop().map(|(_, id)| id).as_deref(), Some("second"));
        assert_eq!(q.pop().map(|(_, id)| id).as_deref(), Some("third"));
    }

    #[test]
    fn earlier_insert_becomes_new_head() {
        let now = Utc::now();
        let mut q = WakeQueue::new();
        q.insert("existing", now + Duration::minutes(10));
        assert_eq!(q.peek().map(|(_, id)| id.to_string()).as_deref(), Some("existing"));

        q.insert("urgent", now + Duration::seconds(5));
        assert_eq!(q.peek().map(|(_, id)| id.to_string()).as_deref(), Some("urgent"));
    }

    #[test]
    fn insert_same_id_replaces_entry() {
        let now = Utc::now();
        let mut q = WakeQueue::new();
        q.insert("job", now + Duration::minutes(1));
        q.insert("job", now + Duration::minutes(30));

        assert_eq!(q.len(), 1);
        let (due, _) = q.pop().expect("entry");
        assert_eq!(due.timestamp(), (now + Duration::minutes(30)).timestamp());
    }

    #[test]
    fn remove_unlinks_entry() {
        let now = Utc::now();
        let mut q = WakeQueue::new();
        q.insert("a", now + Duration::minutes(1));
        q.insert("b", now + Duration::minutes(2));

        assert!(q.remove("a"));
        assert!(!q.remove("a"));
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop().map(|(_, id)| id).as_deref(), Some("b"));
    }
}

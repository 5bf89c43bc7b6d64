use crate::descriptor::{Record, TickerDescriptor};
use crate::error::TaskError;
use crate::extract::Fields;
use std::collections::{HashMap, VecDeque};

/// FIFO of tickers still to scrape. It only ever shrinks.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<TickerDescriptor>,
    served: usize,
}

impl TaskQueue {
    pub fn pop(&mut self) -> Option<TickerDescriptor> {
        let task = self.tasks.pop_front()?;
        self.served += 1;
        Some(task)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of tasks handed out so far.
    pub fn served(&self) -> usize {
        self.served
    }
}

impl From<Vec<TickerDescriptor>> for TaskQueue {
    fn from(tasks: Vec<TickerDescriptor>) -> Self {
        Self {
            tasks: tasks.into(),
            served: 0,
        }
    }
}

/// Merged records by dedup key (`symbol.exchange`). Each key is written once; the first merge
/// wins and later duplicates are discarded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultStore(HashMap<String, Record>);

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Record)> {
        self.0.iter()
    }

    /// Insert `record` unless `key` is already present; returns whether it was inserted.
    pub fn insert_first(&mut self, key: String, record: Record) -> bool {
        use std::collections::hash_map::Entry;

        match self.0.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }
}

/// Outcome of a claim attempt.
#[derive(Debug)]
pub(crate) enum Claim {
    Task(TickerDescriptor),
    /// The ticker's key was already merged by another task.
    Duplicate(TickerDescriptor),
    Done,
}

/// Everything the workers share, guarded by a single lock.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) queue: TaskQueue,
    pub(crate) store: ResultStore,
    pub(crate) failures: Vec<TaskError>,
}

impl Shared {
    pub(crate) fn seed(tickers: Vec<TickerDescriptor>) -> Self {
        Self {
            queue: TaskQueue::from(tickers),
            ..Default::default()
        }
    }

    pub(crate) fn claim(&mut self) -> Claim {
        match self.queue.pop() {
            None => Claim::Done,
            Some(task) if self.store.contains_key(&task.key()) => Claim::Duplicate(task),
            Some(task) => Claim::Task(task),
        }
    }

    pub(crate) fn merge(&mut self, ticker: &TickerDescriptor, fields: &Fields) -> bool {
        self.store.insert_first(ticker.key(), ticker.merge(fields))
    }

    pub(crate) fn fail(&mut self, error: TaskError) {
        self.failures.push(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn ticker(symbol: &str, exchange: &str) -> TickerDescriptor {
        TickerDescriptor::new(symbol, exchange, &format!("http://x/{symbol}"))
    }

    #[test]
    fn queue_pops_in_order_and_counts() {
        let mut queue = TaskQueue::from(vec![ticker("A", "X"), ticker("B", "X")]);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().map(|t| t.symbol), Some("A".to_string()));
        assert_eq!(queue.pop().map(|t| t.symbol), Some("B".to_string()));
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
        assert_eq!(queue.served(), 2);
    }

    #[test]
    fn first_insert_wins() {
        let mut store = ResultStore::new();
        let first = ticker("A", "X").with("name", "first");
        let second = ticker("A", "X").with("name", "second");

        assert!(store.insert_first(first.key(), first.merge(&Fields::new())));
        assert!(!store.insert_first(second.key(), second.merge(&Fields::new())));
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("A.X").and_then(|r| r.get("name")),
            Some(&Value::from("first"))
        );
    }

    #[test]
    fn claim_skips_merged_keys() {
        let mut shared = Shared::seed(vec![ticker("A", "X"), ticker("A", "X")]);

        let Claim::Task(task) = shared.claim() else {
            panic!("expected a task");
        };
        assert!(shared.merge(&task, &Fields::new()));
        assert!(matches!(shared.claim(), Claim::Duplicate(_)));
        assert!(matches!(shared.claim(), Claim::Done));
        assert_eq!(shared.queue.served(), 2);
    }
}

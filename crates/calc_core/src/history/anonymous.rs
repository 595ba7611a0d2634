//! Bounded anonymous calculation history.
//!
//! # Invariants
//! - Never holds more than `capacity` entries; newest entry is first.
//! - Insert and trim happen in one critical section.
//! - Failed evaluations leave the buffer untouched.

use crate::clock::now_epoch_ms;
use crate::engine::evaluator::{evaluate, EvalError};
use crate::engine::render::render_expression;
use crate::model::calculation::Operation;
use log::debug;
use serde::{Serialize, Serializer};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Capacity used when none is configured.
pub const DEFAULT_ANONYMOUS_CAPACITY: usize = 10;

/// Lightweight record of one anonymous computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub operand1: f64,
    pub operand2: Option<f64>,
    /// Serialized as its display symbol (`+`, `√`, ...).
    #[serde(rename = "symbol", serialize_with = "serialize_symbol")]
    pub operation: Operation,
    pub result: f64,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
}

impl HistoryEntry {
    pub fn symbol(&self) -> &'static str {
        self.operation.symbol()
    }

    /// Canonical expression for this entry.
    pub fn expression(&self) -> String {
        render_expression(self.operand1, self.operand2, self.operation)
    }
}

fn serialize_symbol<S>(operation: &Operation, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(operation.symbol())
}

/// Process-wide bounded history shared by unauthenticated callers.
///
/// Share through `Arc<AnonymousHistory>`; all methods take `&self`.
#[derive(Debug)]
pub struct AnonymousHistory {
    capacity: usize,
    entries: Mutex<VecDeque<HistoryEntry>>,
}

impl Default for AnonymousHistory {
    fn default() -> Self {
        Self::new(DEFAULT_ANONYMOUS_CAPACITY)
    }
}

impl AnonymousHistory {
    /// Creates an empty buffer. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Evaluates and records one computation.
    pub fn record_evaluation(
        &self,
        operand1: f64,
        operand2: Option<f64>,
        operation_code: &str,
    ) -> Result<HistoryEntry, EvalError> {
        let evaluation = evaluate(operand1, operand2, operation_code)?;
        let entry = HistoryEntry {
            operand1,
            operand2: evaluation.operand2,
            operation: evaluation.operation,
            result: evaluation.result,
            timestamp: now_epoch_ms(),
        };
        self.push(entry.clone());
        Ok(entry)
    }

    /// Inserts at the front and evicts from the back past capacity.
    pub fn push(&self, entry: HistoryEntry) {
        let mut entries = self.lock();
        entries.push_front(entry);
        entries.truncate(self.capacity);
        debug!(
            "event=anonymous_history_push module=history status=ok len={}",
            entries.len()
        );
    }

    /// Snapshot, newest first.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
        debug!("event=anonymous_history_clear module=history status=ok");
    }

    // A poisoned buffer is still a valid list of entries.
    fn lock(&self) -> MutexGuard<'_, VecDeque<HistoryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{AnonymousHistory, HistoryEntry, DEFAULT_ANONYMOUS_CAPACITY};
    use crate::engine::evaluator::EvalError;
    use crate::model::calculation::Operation;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    fn entry(n: f64) -> HistoryEntry {
        HistoryEntry {
            operand1: n,
            operand2: Some(1.0),
            operation: Operation::Add,
            result: n + 1.0,
            timestamp: 0,
        }
    }

    #[test]
    fn keeps_newest_first_and_evicts_oldest() {
        let history = AnonymousHistory::default();
        for n in 0..11 {
            history.push(entry(f64::from(n)));
        }

        let entries = history.entries();
        assert_eq!(entries.len(), DEFAULT_ANONYMOUS_CAPACITY);
        assert_eq!(entries[0].operand1, 10.0);
        assert_eq!(entries[9].operand1, 1.0);
        assert!(entries.iter().all(|entry| entry.operand1 != 0.0));
    }

    #[test]
    fn record_evaluation_stores_symbol_and_result() {
        let history = AnonymousHistory::new(3);
        let recorded = history.record_evaluation(9.0, Some(2.0), "sqrt").unwrap();

        assert_eq!(recorded.operation, Operation::Sqrt);
        assert_eq!(recorded.symbol(), "√");
        assert_eq!(recorded.operand2, None);
        assert_eq!(recorded.result, 3.0);
        assert_eq!(recorded.expression(), "√(9)");
        assert_eq!(history.entries(), vec![recorded]);
    }

    #[test]
    fn entries_serialize_operation_as_symbol() {
        let mut power = entry(2.0);
        power.operation = Operation::Power;
        power.operand2 = Some(10.0);

        let value = serde_json::to_value(&power).unwrap();
        assert_eq!(value["symbol"], json!("^"));
        assert!(value.get("operation").is_none());
        assert_eq!(power.expression(), "2 ^ 10");
    }

    #[test]
    fn failed_evaluation_records_nothing() {
        let history = AnonymousHistory::new(3);
        let err = history.record_evaluation(1.0, Some(0.0), "divide").unwrap_err();

        assert_eq!(err, EvalError::DivisionByZero);
        assert!(history.is_empty());
    }

    #[test]
    fn clear_resets_buffer() {
        let history = AnonymousHistory::new(2);
        history.push(entry(1.0));
        history.clear();
        assert_eq!(history.len(), 0);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let history = AnonymousHistory::new(0);
        history.push(entry(1.0));
        history.push(entry(2.0));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.entries()[0].operand1, 2.0);
    }

    #[test]
    fn concurrent_writers_never_exceed_capacity() {
        let history = Arc::new(AnonymousHistory::default());
        let handles = (0..8)
            .map(|worker| {
                let history = Arc::clone(&history);
                thread::spawn(move || {
                    for n in 0..50 {
                        history
                            .record_evaluation(f64::from(worker), Some(f64::from(n)), "add")
                            .unwrap();
                        assert!(history.len() <= DEFAULT_ANONYMOUS_CAPACITY);
                    }
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(history.len(), DEFAULT_ANONYMOUS_CAPACITY);
    }
}

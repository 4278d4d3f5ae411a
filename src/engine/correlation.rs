//! Records pairing a worker's result with the position it came from.
//!
//! Workers finish in any order. Each one reports its origin index so the
//! collecting thread can restore input order where a stage promises it.
//! Ordering is by index only; the payload never takes part in comparisons.

use std::cmp::Ordering;

/// What a worker sends back: its result, or the payload of the panic that ended it.
pub(crate) type WorkerResult<R> = std::thread::Result<R>;

/// A computed value tagged with the zero-based index of its input item.
#[derive(Debug)]
pub(crate) struct Indexed<T> {
    pub index: usize,
    pub value: T,
}

impl<T> Indexed<T> {
    pub fn new(index: usize, value: T) -> Self {
        Self { index, value }
    }
}

/// Outcome of a filter worker: the item itself plus whether it survived.
#[derive(Debug)]
pub(crate) struct Verdict<T> {
    pub index: usize,
    pub keep: bool,
    pub item: T,
}

impl<T> PartialEq for Verdict<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Verdict<T> {}

impl<T> PartialOrd for Verdict<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Verdict<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

/// Fixed-size, index-addressed landing area for ordered results.
pub(crate) struct Slots<T> {
    slots: Vec<Option<T>>,
}

impl<T> Slots<T> {
    pub fn new(length: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(length).collect(),
        }
    }

    pub fn put(&mut self, record: Indexed<T>) {
        self.slots[record.index] = Some(record.value);
    }

    /// Values in ascending index order. Unfilled slots are skipped.
    pub fn into_values(self) -> impl Iterator<Item = T> {
        self.slots.into_iter().flatten()
    }
}

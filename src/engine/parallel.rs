//! Round-based batch scheduler.
//!
//! Every parallel stage goes through [`ParallelExecutor::scatter`]: one
//! worker per input item, launched in consecutive batches of `degree`
//! items. After launching a batch the collecting thread drains exactly
//! that many results before the next batch starts, so a slow item holds
//! up its whole batch. Workers run on a dedicated rayon pool with
//! `degree` threads.
//!
//! Nothing is ever cancelled. When a short-circuiting stage stops
//! reading, the workers already launched still run to completion. The
//! result channel is bounded to the full input length so their sends
//! never block, and a send to a dropped receiver is ignored.
//!
//! A pipeline evaluated from inside one of its own engine's workers
//! does not block that worker; it runs queued pool jobs while waiting.
//!
//! A panic in a worker is caught, carried through the channel, and
//! re-raised on the collecting thread.

use super::correlation::{Indexed, Slots, Verdict, WorkerResult};
use super::Executor;
use crate::errors::{PipelineError, Result};
use crate::pipeline::{Comparator, Consumer, Element, FlatMapper, KeyFn, Mapper, Order, Predicate};
use crate::sort::{merge_sort_with_cutoff, DEFAULT_SORT_CUTOFF};
use crossbeam::channel;
use log::{debug, trace};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

/// Runs stages with at most `degree` workers in flight.
///
/// Clones share the same worker pool.
#[derive(Debug, Clone)]
pub struct ParallelExecutor {
    pool: Arc<ThreadPool>,
    degree: NonZeroUsize,
    sort_cutoff: usize,
}

impl ParallelExecutor {
    /// Start a pool of `degree` workers.
    pub fn new(degree: usize) -> Result<Self> {
        Self::with_sort_cutoff(degree, DEFAULT_SORT_CUTOFF)
    }

    /// Start a pool of `degree` workers; merge sort stops splitting at `sort_cutoff`.
    pub fn with_sort_cutoff(degree: usize, sort_cutoff: usize) -> Result<Self> {
        let degree = NonZeroUsize::new(degree).ok_or(PipelineError::InvalidConcurrency { degree })?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(degree.get())
            .thread_name(|i| format!("flowline-worker-{}", i))
            .build()?;
        debug!(
            "Started parallel engine with {} workers (sort cutoff {})",
            degree, sort_cutoff
        );
        Ok(Self {
            pool: Arc::new(pool),
            degree,
            sort_cutoff: sort_cutoff.max(1),
        })
    }

    pub fn degree(&self) -> NonZeroUsize {
        self.degree
    }

    pub fn sort_cutoff(&self) -> usize {
        self.sort_cutoff
    }

    /// Fan `items` out to workers in batches and feed each result to `drain`.
    ///
    /// `work` receives the item's origin index along with the item. Results
    /// reach `drain` in completion order within a batch. Returns
    /// `ControlFlow::Break` as soon as `drain` does, leaving the rest of the
    /// current batch detached and never launching later batches.
    fn scatter<T, R, W, D>(&self, items: Vec<T>, work: W, mut drain: D) -> ControlFlow<()>
    where
        T: Send + 'static,
        R: Send + 'static,
        W: Fn(usize, T) -> R + Send + Sync + 'static,
        D: FnMut(R) -> ControlFlow<()>,
    {
        let total = items.len();
        if total == 0 {
            return ControlFlow::Continue(());
        }

        let (tx, rx) = channel::bounded(total);
        let work = Arc::new(work);
        let batch_size = self.degree.get();
        let mut pending = items.into_iter().enumerate().peekable();
        let mut batch = 0usize;

        while pending.peek().is_some() {
            let mut launched = 0usize;
            for (index, item) in pending.by_ref().take(batch_size) {
                let tx = tx.clone();
                let work = Arc::clone(&work);
                self.pool.spawn(move || {
                    let outcome: WorkerResult<R> =
                        panic::catch_unwind(AssertUnwindSafe(|| work(index, item)));
                    // The receiver is gone if the consumer short-circuited.
                    let _ = tx.send(outcome);
                });
                launched += 1;
            }
            trace!("Batch {}: launched {} of {} workers", batch, launched, total);

            for _ in 0..launched {
                // `tx` is still held here, so the channel cannot disconnect.
                let Some(outcome) = self.receive(&rx) else {
                    break;
                };
                match outcome {
                    Ok(result) => {
                        if drain(result).is_break() {
                            trace!("Batch {}: short-circuited", batch);
                            return ControlFlow::Break(());
                        }
                    }
                    Err(payload) => panic::resume_unwind(payload),
                }
            }
            batch += 1;
        }
        ControlFlow::Continue(())
    }

    /// Wait for the next worker result.
    ///
    /// A caller that is itself one of this pool's workers (a callback
    /// evaluating a pipeline on the same engine) must not block: the jobs
    /// it waits for are queued behind it. It runs queued pool work instead
    /// until its result arrives.
    fn receive<R>(&self, rx: &channel::Receiver<WorkerResult<R>>) -> Option<WorkerResult<R>> {
        if self.pool.current_thread_index().is_none() {
            return rx.recv().ok();
        }
        loop {
            match rx.try_recv() {
                Ok(outcome) => return Some(outcome),
                Err(channel::TryRecvError::Disconnected) => return None,
                Err(channel::TryRecvError::Empty) => {
                    if !matches!(rayon::yield_now(), Some(rayon::Yield::Executed)) {
                        thread::yield_now();
                    }
                }
            }
        }
    }

    /// Items in index order after running `work` on each.
    fn ordered<T, R, W>(&self, items: Vec<T>, work: W) -> impl Iterator<Item = R>
    where
        T: Send + 'static,
        R: Send + 'static,
        W: Fn(T) -> R + Send + Sync + 'static,
    {
        let mut slots = Slots::new(items.len());
        let _ = self.scatter(
            items,
            move |index, item| Indexed::new(index, work(item)),
            |record| {
                slots.put(record);
                ControlFlow::Continue(())
            },
        );
        slots.into_values()
    }

    /// Results of `work` in completion order.
    fn unordered<T, R, W>(&self, items: Vec<T>, work: W) -> Vec<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        W: Fn(T) -> R + Send + Sync + 'static,
    {
        let mut results = Vec::with_capacity(items.len());
        let _ = self.scatter(
            items,
            move |_, item| work(item),
            |result| {
                results.push(result);
                ControlFlow::Continue(())
            },
        );
        results
    }
}

impl Executor for ParallelExecutor {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn all_match<T: Element>(&self, items: Vec<T>, predicate: &Predicate<T>) -> bool {
        if items.is_empty() {
            return false;
        }
        let predicate = Arc::clone(predicate);
        self.scatter(
            items,
            move |_, item| predicate(&item),
            |matched| {
                if matched {
                    ControlFlow::Continue(())
                } else {
                    ControlFlow::Break(())
                }
            },
        )
        .is_continue()
    }

    fn any_match<T: Element>(&self, items: Vec<T>, predicate: &Predicate<T>) -> bool {
        let predicate = Arc::clone(predicate);
        self.scatter(
            items,
            move |_, item| predicate(&item),
            |matched| {
                if matched {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        )
        .is_break()
    }

    fn filter<T: Element>(&self, items: Vec<T>, predicate: &Predicate<T>, order: Order) -> Vec<T> {
        let predicate = Arc::clone(predicate);
        let work = move |index, item: T| Verdict {
            index,
            keep: predicate(&item),
            item,
        };

        match order {
            Order::Unordered => {
                let mut kept = Vec::new();
                let _ = self.scatter(items, work, |verdict| {
                    if verdict.keep {
                        kept.push(verdict.item);
                    }
                    ControlFlow::Continue(())
                });
                kept
            }
            Order::Ordered => {
                let mut survivors = BinaryHeap::new();
                let _ = self.scatter(items, work, |verdict| {
                    if verdict.keep {
                        survivors.push(Reverse(verdict));
                    }
                    ControlFlow::Continue(())
                });
                let mut kept = Vec::with_capacity(survivors.len());
                while let Some(Reverse(verdict)) = survivors.pop() {
                    kept.push(verdict.item);
                }
                kept
            }
        }
    }

    fn map<T: Element, U: Element>(
        &self,
        items: Vec<T>,
        mapper: &Mapper<T, U>,
        order: Order,
    ) -> Vec<U> {
        let mapper = Arc::clone(mapper);
        match order {
            Order::Unordered => self.unordered(items, move |item| mapper(item)),
            Order::Ordered => self.ordered(items, move |item| mapper(item)).collect(),
        }
    }

    fn flat_map<T: Element, U: Element>(
        &self,
        items: Vec<T>,
        mapper: &FlatMapper<T, U>,
        order: Order,
    ) -> Vec<U> {
        let mapper = Arc::clone(mapper);
        match order {
            Order::Unordered => self
                .unordered(items, move |item| mapper(item))
                .into_iter()
                .flatten()
                .collect(),
            Order::Ordered => self.ordered(items, move |item| mapper(item)).flatten().collect(),
        }
    }

    fn peek<T: Element>(&self, items: Vec<T>, consumer: &Consumer<T>) -> Vec<T> {
        let consumer = Arc::clone(consumer);
        self.ordered(items, move |item| {
            consumer(&item);
            item
        })
        .collect()
    }

    fn for_each<T: Element>(&self, items: Vec<T>, consumer: &Consumer<T>) {
        let consumer = Arc::clone(consumer);
        let _ = self.scatter(
            items,
            move |_, item| consumer(&item),
            |()| ControlFlow::Continue(()),
        );
    }

    /// Keys are computed by workers; the map is only touched between drains.
    ///
    /// When several items share a key, whichever result is drained last
    /// survives. Which one that is depends on completion timing. Output
    /// order is unspecified.
    fn distinct<T, K>(&self, items: Vec<T>, key: &KeyFn<T, K>) -> Vec<T>
    where
        T: Element,
        K: Hash + Eq + Send + 'static,
    {
        let key = Arc::clone(key);
        let mut unique = HashMap::with_capacity(items.len());
        let _ = self.scatter(
            items,
            move |_, item| (key(&item), item),
            |(hash, item)| {
                unique.insert(hash, item);
                ControlFlow::Continue(())
            },
        );
        unique.into_values().collect()
    }

    /// Workers swap positions `i` and `len - 1 - i` for every `i < len / 2`.
    fn reverse<T: Element>(&self, mut items: Vec<T>) -> Vec<T> {
        let length = items.len();
        let half = length / 2;
        if half == 0 {
            return items;
        }

        let back = items.split_off(length - half);
        let pairs: Vec<(T, T)> = items.drain(..half).zip(back.into_iter().rev()).collect();
        let middle = items;

        let mut front_slots = Slots::new(half);
        let mut back_slots = Slots::new(half);
        let _ = self.scatter(
            pairs,
            |index, (front, back)| Indexed::new(index, (back, front)),
            |swapped| {
                let (front, back) = swapped.value;
                front_slots.put(Indexed::new(swapped.index, front));
                back_slots.put(Indexed::new(swapped.index, back));
                ControlFlow::Continue(())
            },
        );

        let mut back: Vec<T> = back_slots.into_values().collect();
        back.reverse();
        front_slots
            .into_values()
            .chain(middle)
            .chain(back)
            .collect()
    }

    /// Merge sort; its recursion is not bounded by `degree`.
    fn sort<T: Element>(&self, items: Vec<T>, less: &Comparator<T>) -> Vec<T> {
        merge_sort_with_cutoff(items, &**less, self.sort_cutoff)
    }
}

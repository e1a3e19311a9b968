//! Garbage collector service.
//!
//! One [`Collector`] is shared (via `Arc`) by every evaluating thread. A single
//! `parking_lot::Mutex` guards the arena, so allocation, scanning and release
//! never interleave.
//!
//! Threads take part as [`Mutator`]s. A mutator's fresh temporaries are
//! invisible to other threads' sweeps until they are bound somewhere or the
//! mutator retires. Values held across nested evaluation but not bound in
//! a frame are kept alive with a [`PinGuard`].

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::config::CollectorConfig;
use crate::heap::{CollectorStats, Heap, MutatorId, PoolList, NO_OWNER};
use crate::value::{Attributes, ValueId};

/// What a collection cycle did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub freed: usize,
    pub bytes: usize,
    pub promoted: usize,
    /// Whether the lag list was swept too.
    pub full: bool,
}

/// The collector.
pub struct Collector {
    heap: Mutex<Heap>,
    next_mutator: AtomicU32,
}

impl Collector {
    pub fn new(config: CollectorConfig) -> Arc<Self> {
        Arc::new(Collector {
            heap: Mutex::new(Heap::new(config)),
            next_mutator: AtomicU32::new(1),
        })
    }

    /// Register an evaluating thread.
    pub fn register_mutator(self: &Arc<Self>) -> Mutator {
        let id = self.next_mutator.fetch_add(1, Ordering::Relaxed);
        self.heap.lock().live_mutators.insert(id);
        trace!(mutator = id, "mutator registered");
        Mutator {
            id,
            collector: Arc::clone(self),
        }
    }

    fn retire(&self, id: MutatorId) {
        self.heap.lock().live_mutators.remove(&id);
        trace!(mutator = id, "mutator retired");
    }

    /// Lock the arena without acting as any mutator.
    pub fn lock(&self) -> MutexGuard<'_, Heap> {
        let mut heap = self.heap.lock();
        heap.owner = NO_OWNER;
        heap
    }

    /// Keep `id` alive until the guard drops.
    ///
    /// The guard takes the arena lock when dropped, so it must not outlive
    /// a heap guard held by the same thread.
    pub fn pin(self: &Arc<Self>, id: ValueId) -> PinGuard {
        self.heap.lock().pin(id);
        PinGuard {
            collector: Arc::clone(self),
            id,
        }
    }

    /// Run a cycle if usage has reached the GC threshold.
    pub fn collect(&self, mutator: &Mutator) -> Option<SweepReport> {
        let mut heap = self.heap.lock();
        if heap.usage < heap.config.gc_threshold {
            return None;
        }
        heap.owner = mutator.id;
        Some(sweep(&mut heap))
    }

    /// Run a cycle regardless of usage.
    pub fn collect_now(&self, mutator: &Mutator) -> SweepReport {
        let mut heap = self.heap.lock();
        heap.owner = mutator.id;
        sweep(&mut heap)
    }

    /// Change the GC threshold, returning the previous one.
    pub fn set_gc_threshold(&self, bytes: usize) -> usize {
        let mut heap = self.heap.lock();
        std::mem::replace(&mut heap.config.gc_threshold, bytes)
    }

    pub fn stats(&self) -> CollectorStats {
        self.heap.lock().stats()
    }

    /// Free every entry, constants included.
    ///
    /// Entries are released in hierarchy order: references, classes,
    /// structures, maps and vectors before the scalars they contain.
    pub fn release(&self) {
        let mut heap = self.heap.lock();
        let mut all: Vec<(u8, u32)> = heap
            .constants
            .iter()
            .chain(heap.heap.iter())
            .chain(heap.lag.iter())
            .filter_map(|&index| {
                heap.entry_at(index)
                    .map(|e| (e.value.tag().hierarchy_rank(), index))
            })
            .collect();
        all.sort_by(|a, b| b.0.cmp(&a.0));
        let count = all.len();
        let mut bytes = 0;
        for (_, index) in all {
            bytes += heap.free_index(index);
        }
        heap.clear_interned();
        debug!(items = count, bytes, "collector released");
    }
}

fn sweep(heap: &mut Heap) -> SweepReport {
    heap.collections += 1;
    let full = heap.collections % heap.config.full_sweep_interval.max(1) == 0;
    let mut report = SweepReport {
        full,
        ..SweepReport::default()
    };

    // Repeat until nothing new becomes free, so a dead container and the
    // children it held go in the same cycle.
    loop {
        let mut candidates: Vec<u32> = heap.heap.iter().copied().collect();
        if full {
            candidates.extend(heap.lag.iter().copied());
        }
        let mut freed_this_pass = 0;
        for index in candidates {
            let reclaim = heap.entry_at(index).is_some_and(|e| heap.reclaimable(e));
            if reclaim {
                report.bytes += heap.free_index(index);
                freed_this_pass += 1;
            }
        }
        report.freed += freed_this_pass;
        if freed_this_pass == 0 {
            break;
        }
    }

    report.promoted = promote_survivors(heap);
    debug!(
        cycle = heap.collections,
        freed = report.freed,
        bytes = report.bytes,
        promoted = report.promoted,
        full,
        usage = heap.usage,
        "gc collection"
    );
    report
}

/// Move long-lived heap survivors to the lag list.
fn promote_survivors(heap: &mut Heap) -> usize {
    let cycle = heap.collections;
    let min_cycles = u64::from(heap.config.lag_min_cycles.max(1));
    let ratio = heap.config.lagging_ratio;
    let survivors: Vec<u32> = heap.heap.iter().copied().collect();
    let mut promoted = Vec::new();
    for index in survivors {
        let Some(e) = heap.entry_at_mut(index) else {
            continue;
        };
        e.survived += 1;
        let seen = cycle.saturating_sub(e.born).max(1);
        #[allow(clippy::cast_precision_loss)]
        let survival = f64::from(e.survived) / seen as f64;
        if seen >= min_cycles && survival >= ratio {
            e.list = PoolList::Lag;
            e.attributes.insert(Attributes::LAGGING);
            promoted.push(index);
        }
    }
    for &index in &promoted {
        heap.heap.swap_remove(&index);
        heap.lag.insert(index);
    }
    promoted.len()
}

/// An evaluating thread's registration with the collector.
///
/// Dropping it retires the id; its leftover temporaries become reclaimable
/// by any thread.
pub struct Mutator {
    id: MutatorId,
    collector: Arc<Collector>,
}

impl Mutator {
    #[inline]
    pub fn id(&self) -> MutatorId {
        self.id
    }

    #[inline]
    pub fn collector(&self) -> &Arc<Collector> {
        &self.collector
    }

    /// Lock the arena as this mutator. New allocations are owned by it.
    pub fn heap(&self) -> MutexGuard<'_, Heap> {
        let mut heap = self.collector.heap.lock();
        heap.owner = self.id;
        heap
    }

    pub fn collect(&self) -> Option<SweepReport> {
        self.collector.collect(self)
    }

    pub fn pin(&self, id: ValueId) -> PinGuard {
        self.collector.pin(id)
    }
}

impl Drop for Mutator {
    fn drop(&mut self) {
        self.collector.retire(self.id);
    }
}

impl std::fmt::Debug for Mutator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutator").field("id", &self.id).finish()
    }
}

/// Keeps a value alive while evaluation holds it outside any frame.
#[must_use = "the value is unpinned as soon as the guard drops"]
pub struct PinGuard {
    collector: Arc<Collector>,
    id: ValueId,
}

impl PinGuard {
    #[inline]
    pub fn id(&self) -> ValueId {
        self.id
    }
}

impl Drop for PinGuard {
    fn drop(&mut self) {
        self.collector.heap.lock().unpin(self.id);
    }
}

//! The value arena.
//!
//! `Heap` owns every runtime value. It is only ever reached through the
//! collector's lock, so its methods take `&mut self` and never block.
//!
//! Entries sit in one of three pool lists: `constants` (the tree's literal
//! pool, freed only at teardown), `heap` (fresh allocations) and `lag`
//! (long-lived survivors, swept less often).

use hyb_ir::Literal;
use indexmap::IndexSet;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};

use crate::config::CollectorConfig;
use crate::errors::{arena_exhausted, internal, memory_ceiling, EvalResult};
use crate::value::{AliasTarget, Attributes, Instance, MapValue, Value, ValueId};

/// Identifies an evaluating thread to the collector. `0` means no owner.
pub type MutatorId = u32;

pub(crate) const NO_OWNER: MutatorId = 0;

/// Deepest `Reference` chain `resolve` follows before giving up.
const MAX_REFERENCE_DEPTH: usize = 64;

type SlotSet = IndexSet<u32, FxBuildHasher>;

/// Pool list an entry belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PoolList {
    Constants,
    Heap,
    Lag,
}

#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) value: Value,
    pub(crate) refs: i32,
    pub(crate) attributes: Attributes,
    pub(crate) pins: u32,
    pub(crate) size: usize,
    /// Collections this entry survived.
    pub(crate) survived: u32,
    /// Collection count when the entry was allocated.
    pub(crate) born: u64,
    pub(crate) owner: MutatorId,
    pub(crate) list: PoolList,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Counters reported by `gc_stats` and tracing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectorStats {
    pub items: usize,
    pub usage: usize,
    pub collections: u64,
    pub constants: usize,
    pub heap: usize,
    pub lag: usize,
    pub gc_threshold: usize,
    pub mm_threshold: usize,
}

/// Arena of reference-counted value slots.
pub struct Heap {
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    pub(crate) constants: SlotSet,
    pub(crate) heap: SlotSet,
    pub(crate) lag: SlotSet,
    interned: FxHashMap<Literal, ValueId>,
    pub(crate) items: usize,
    pub(crate) usage: usize,
    pub(crate) collections: u64,
    /// Mutator currently holding the lock.
    pub(crate) owner: MutatorId,
    pub(crate) live_mutators: FxHashSet<MutatorId>,
    pub(crate) config: CollectorConfig,
}

impl Heap {
    pub fn new(config: CollectorConfig) -> Self {
        Heap {
            slots: Vec::new(),
            free_slots: Vec::new(),
            constants: SlotSet::default(),
            heap: SlotSet::default(),
            lag: SlotSet::default(),
            interned: FxHashMap::default(),
            items: 0,
            usage: 0,
            collections: 0,
            owner: NO_OWNER,
            live_mutators: FxHashSet::default(),
            config,
        }
    }

    // Allocation

    /// Allocate a temporary owned by the current mutator.
    pub fn alloc(&mut self, value: Value) -> EvalResult<ValueId> {
        self.alloc_in(value, PoolList::Heap, Attributes::GARBAGE)
    }

    fn alloc_in(
        &mut self,
        value: Value,
        list: PoolList,
        attributes: Attributes,
    ) -> EvalResult<ValueId> {
        let size = value.footprint();
        if self.usage + size > self.config.mm_threshold {
            return Err(memory_ceiling(self.usage, size, self.config.mm_threshold));
        }
        let entry = Entry {
            value,
            refs: 0,
            attributes,
            pins: 0,
            size,
            survived: 0,
            born: self.collections,
            owner: self.owner,
            list,
        };
        let index = match self.free_slots.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len()).map_err(|_| arena_exhausted())?;
                self.slots.push(Slot::default());
                index
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.entry = Some(entry);
        let id = ValueId {
            index,
            generation: slot.generation,
        };
        self.list_mut(list).insert(index);
        self.items += 1;
        self.usage += size;
        Ok(id)
    }

    /// Intern a literal in the constant pool. Equal literals share one slot.
    pub fn intern(&mut self, literal: &Literal) -> EvalResult<ValueId> {
        if let Some(&id) = self.interned.get(literal) {
            if self.contains(id) {
                return Ok(id);
            }
        }
        let value = match literal {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(n) => Value::Int(*n),
            Literal::Float(_) => Value::Float(literal.as_float().unwrap_or_default()),
            Literal::Char(c) => Value::Char(*c),
            Literal::Str(s) => Value::Str(s.clone()),
        };
        let id = self.alloc_in(value, PoolList::Constants, Attributes::CONSTANT)?;
        self.interned.insert(literal.clone(), id);
        Ok(id)
    }

    // Access

    fn entry(&self, id: ValueId) -> Option<&Entry> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    fn entry_mut(&mut self, id: ValueId) -> Option<&mut Entry> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    #[inline]
    pub fn contains(&self, id: ValueId) -> bool {
        self.entry(id).is_some()
    }

    pub fn get(&self, id: ValueId) -> EvalResult<&Value> {
        self.entry(id)
            .map(|e| &e.value)
            .ok_or_else(|| stale(id))
    }

    pub fn get_mut(&mut self, id: ValueId) -> EvalResult<&mut Value> {
        self.entry_mut(id)
            .map(|e| &mut e.value)
            .ok_or_else(|| stale(id))
    }

    pub fn refs(&self, id: ValueId) -> Option<i32> {
        self.entry(id).map(|e| e.refs)
    }

    /// Whether `id` lives in the constant pool.
    #[inline]
    pub fn is_constant(&self, id: ValueId) -> bool {
        self.attributes(id)
            .is_some_and(|attrs| attrs.contains(Attributes::CONSTANT))
    }

    pub fn attributes(&self, id: ValueId) -> Option<Attributes> {
        self.entry(id).map(|e| e.attributes)
    }

    pub fn list_of(&self, id: ValueId) -> Option<PoolList> {
        self.entry(id).map(|e| e.list)
    }

    /// Follow `Reference` indirections to the value they point at.
    pub fn resolve(&self, id: ValueId) -> EvalResult<ValueId> {
        let mut current = id;
        for _ in 0..MAX_REFERENCE_DEPTH {
            match self.get(current)? {
                Value::Reference(target) => current = *target,
                _ => return Ok(current),
            }
        }
        Err(internal("reference chain too deep"))
    }

    // Reference counting

    /// Record one more holder (a frame binding or a container slot).
    ///
    /// A held value is no longer a temporary of the mutator that made it.
    pub fn incref(&mut self, id: ValueId) {
        if let Some(e) = self.entry_mut(id) {
            e.refs += 1;
            e.attributes.remove(Attributes::GARBAGE);
            e.owner = NO_OWNER;
        }
    }

    /// Drop one holder. Stale ids are ignored: teardown frees parents and
    /// children in rank order, not dependency order.
    pub fn decref(&mut self, id: ValueId) {
        if let Some(e) = self.entry_mut(id) {
            e.refs -= 1;
        }
    }

    /// Hand an unheld value back to the current mutator as a temporary.
    ///
    /// Used for values that outlive the frame that held them (call results,
    /// raised exceptions, joined thread results).
    pub fn claim(&mut self, id: ValueId) {
        let owner = self.owner;
        if let Some(e) = self.entry_mut(id) {
            if e.refs <= 0 && !e.attributes.contains(Attributes::CONSTANT) {
                e.refs = 0;
                e.owner = owner;
                e.attributes.insert(Attributes::GARBAGE);
            }
        }
    }

    pub fn pin(&mut self, id: ValueId) {
        if let Some(e) = self.entry_mut(id) {
            e.pins += 1;
        }
    }

    #[inline]
    pub fn is_pinned(&self, id: ValueId) -> bool {
        self.entry(id).is_some_and(|e| e.pins > 0)
    }

    pub fn unpin(&mut self, id: ValueId) {
        if let Some(e) = self.entry_mut(id) {
            e.pins = e.pins.saturating_sub(1);
        }
    }

    /// Prepare `id` to be stored in a binding or container slot.
    ///
    /// Constants and values that already have a holder are deep-cloned;
    /// anything else is moved. The stored id has its count incremented.
    pub fn adopt(&mut self, id: ValueId) -> EvalResult<ValueId> {
        let needs_clone = {
            let e = self.entry(id).ok_or_else(|| stale(id))?;
            e.attributes.contains(Attributes::CONSTANT) || e.refs > 0
        };
        let stored = if needs_clone { self.deep_clone(id)? } else { id };
        self.incref(stored);
        Ok(stored)
    }

    /// Independent copy of a value and everything it contains.
    ///
    /// References and value aliases keep pointing at the same target.
    pub fn deep_clone(&mut self, id: ValueId) -> EvalResult<ValueId> {
        let value = self.get(id)?.clone();
        let copy = match value {
            Value::Vector(items) => Value::Vector(self.clone_children(&items)?),
            Value::Map(map) => Value::Map(MapValue {
                keys: self.clone_children(&map.keys)?,
                values: self.clone_children(&map.values)?,
            }),
            Value::Struct(inst) => Value::Struct(self.clone_instance(inst)?),
            Value::Class(inst) => Value::Class(self.clone_instance(inst)?),
            Value::Reference(target) => {
                self.incref(target);
                Value::Reference(target)
            }
            Value::Alias(AliasTarget::Value(target)) => {
                self.incref(target);
                Value::Alias(AliasTarget::Value(target))
            }
            other => other,
        };
        self.alloc(copy)
    }

    fn clone_children(&mut self, ids: &[ValueId]) -> EvalResult<Vec<ValueId>> {
        let mut out = Vec::with_capacity(ids.len());
        for &child in ids {
            let copy = self.deep_clone(child)?;
            self.incref(copy);
            out.push(copy);
        }
        Ok(out)
    }

    fn clone_instance(&mut self, inst: Instance) -> EvalResult<Instance> {
        let mut fields = Vec::with_capacity(inst.fields.len());
        for (name, child) in inst.fields {
            let copy = self.deep_clone(child)?;
            self.incref(copy);
            fields.push((name, copy));
        }
        Ok(Instance {
            type_name: inst.type_name,
            fields,
        })
    }

    /// Replace the contents of `target` with a copy of `source`, in place.
    ///
    /// Everything holding `target` (frames, containers, references) sees the
    /// new contents.
    pub fn overwrite(&mut self, target: ValueId, source: ValueId) -> EvalResult<()> {
        if self.is_constant(target) {
            return Err(internal("constant written in place"));
        }
        let copy = self.deep_clone(source)?;
        let value = std::mem::replace(self.get_mut(copy)?, Value::Bool(false));
        self.free_index(copy.index);
        let old = std::mem::replace(self.get_mut(target)?, value);
        for child in old.children() {
            self.decref(child);
        }
        self.refresh_size(target)
    }

    /// Re-account an entry whose value was mutated in place.
    pub fn refresh_size(&mut self, id: ValueId) -> EvalResult<()> {
        let Some(e) = self.entry_mut(id) else {
            return Err(stale(id));
        };
        let new = e.value.footprint();
        let old = std::mem::replace(&mut e.size, new);
        if new > old && self.usage + (new - old) > self.config.mm_threshold {
            let usage = self.usage;
            let limit = self.config.mm_threshold;
            if let Some(e) = self.entry_mut(id) {
                e.size = old;
            }
            return Err(memory_ceiling(usage, new - old, limit));
        }
        self.usage = self.usage - old + new;
        Ok(())
    }

    // Release

    /// Whether the collector may free this entry now.
    pub(crate) fn reclaimable(&self, e: &Entry) -> bool {
        !e.attributes.contains(Attributes::CONSTANT)
            && e.refs <= 0
            && e.pins == 0
            && (e.owner == NO_OWNER
                || e.owner == self.owner
                || !self.live_mutators.contains(&e.owner))
    }

    pub(crate) fn entry_at(&self, index: u32) -> Option<&Entry> {
        self.slots.get(index as usize)?.entry.as_ref()
    }

    pub(crate) fn entry_at_mut(&mut self, index: u32) -> Option<&mut Entry> {
        self.slots.get_mut(index as usize)?.entry.as_mut()
    }

    /// Free a temporary right away when nothing holds it.
    ///
    /// Returns whether the value was freed.
    pub fn release_temporary(&mut self, id: ValueId) -> bool {
        let Some(e) = self.entry(id) else {
            return false;
        };
        if e.attributes.contains(Attributes::GARBAGE) && self.reclaimable(e) {
            self.free_index(id.index);
            true
        } else {
            false
        }
    }

    /// Remove the slot at `index` and drop one count on each child.
    ///
    /// Children are not freed here; the collector picks them up once their
    /// count reaches zero.
    pub(crate) fn free_index(&mut self, index: u32) -> usize {
        let Some(slot) = self.slots.get_mut(index as usize) else {
            return 0;
        };
        let Some(entry) = slot.entry.take() else {
            return 0;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(index);
        self.list_mut(entry.list).swap_remove(&index);
        self.items -= 1;
        self.usage -= entry.size;
        for child in entry.value.children() {
            self.decref(child);
        }
        entry.size
    }

    pub(crate) fn list_mut(&mut self, list: PoolList) -> &mut SlotSet {
        match list {
            PoolList::Constants => &mut self.constants,
            PoolList::Heap => &mut self.heap,
            PoolList::Lag => &mut self.lag,
        }
    }

    pub(crate) fn clear_interned(&mut self) {
        self.interned.clear();
    }

    // Container helpers

    /// Allocate a vector, adopting each element.
    pub fn alloc_vector(&mut self, items: &[ValueId]) -> EvalResult<ValueId> {
        let mut stored = Vec::with_capacity(items.len());
        for &item in items {
            stored.push(self.adopt(item)?);
        }
        self.alloc(Value::Vector(stored))
    }

    /// Allocate a string value.
    pub fn alloc_str(&mut self, s: impl Into<String>) -> EvalResult<ValueId> {
        self.alloc(Value::Str(s.into()))
    }

    pub fn stats(&self) -> CollectorStats {
        CollectorStats {
            items: self.items,
            usage: self.usage,
            collections: self.collections,
            constants: self.constants.len(),
            heap: self.heap.len(),
            lag: self.lag.len(),
            gc_threshold: self.config.gc_threshold,
            mm_threshold: self.config.mm_threshold,
        }
    }

    #[inline]
    pub fn usage(&self) -> usize {
        self.usage
    }

    #[inline]
    pub fn items(&self) -> usize {
        self.items
    }
}

#[cold]
fn stale(id: ValueId) -> crate::errors::EvalError {
    internal(format!("use of released value {id:?}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;

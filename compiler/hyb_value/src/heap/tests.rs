use super::*;
use pretty_assertions::assert_eq;

fn heap() -> Heap {
    Heap::new(CollectorConfig::default())
}

#[test]
fn alloc_tracks_items_and_usage() {
    let mut h = heap();
    let a = h.alloc(Value::Int(1)).unwrap();
    let b = h.alloc_str("hello").unwrap();
    assert_eq!(h.items(), 2);
    assert_eq!(
        h.usage(),
        Value::Int(1).footprint() + Value::Str("hello".into()).footprint()
    );
    assert_eq!(h.get(a).unwrap(), &Value::Int(1));
    assert_eq!(h.attributes(b), Some(Attributes::GARBAGE));
    assert_eq!(h.list_of(b), Some(PoolList::Heap));
}

#[test]
fn alloc_beyond_ceiling_fails() {
    let mut h = Heap::new(CollectorConfig::default().with_mm_threshold(64));
    let err = h.alloc(Value::Str("x".repeat(1000))).unwrap_err();
    assert_eq!(err.class(), crate::ErrorClass::MemoryCeiling);
    assert_eq!(h.items(), 0);
}

#[test]
fn stale_ids_are_detected() {
    let mut h = heap();
    let a = h.alloc(Value::Int(1)).unwrap();
    h.free_index(a.index());
    let b = h.alloc(Value::Int(2)).unwrap();
    assert_eq!(a.index(), b.index());
    assert!(!h.contains(a));
    assert!(h.get(a).is_err());
    assert_eq!(h.get(b).unwrap(), &Value::Int(2));
}

#[test]
fn interned_constants_share_identity() {
    let mut h = heap();
    let a = h.intern(&Literal::Int(5)).unwrap();
    let b = h.intern(&Literal::Int(5)).unwrap();
    let c = h.intern(&Literal::Str("5".into())).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(h.list_of(a), Some(PoolList::Constants));
    assert!(h.attributes(a).unwrap().contains(Attributes::CONSTANT));
}

#[test]
fn adopt_moves_fresh_temporaries() {
    let mut h = heap();
    let t = h.alloc(Value::Int(3)).unwrap();
    let stored = h.adopt(t).unwrap();
    assert_eq!(stored, t);
    assert_eq!(h.refs(t), Some(1));
    assert!(!h.attributes(t).unwrap().contains(Attributes::GARBAGE));
}

#[test]
fn adopt_clones_constants_and_held_values() {
    let mut h = heap();
    let k = h.intern(&Literal::Int(3)).unwrap();
    let stored = h.adopt(k).unwrap();
    assert_ne!(stored, k);
    assert_eq!(h.refs(k), Some(0));
    assert_eq!(h.get(stored).unwrap(), &Value::Int(3));

    let again = h.adopt(stored).unwrap();
    assert_ne!(again, stored);
    assert_eq!(h.refs(stored), Some(1));
    assert_eq!(h.refs(again), Some(1));
}

#[test]
fn deep_clone_is_independent() {
    let mut h = heap();
    let one = h.alloc(Value::Int(1)).unwrap();
    let two = h.alloc(Value::Int(2)).unwrap();
    let v = h.alloc_vector(&[one, two]).unwrap();

    let copy = h.deep_clone(v).unwrap();
    let Value::Vector(copied) = h.get(copy).unwrap().clone() else {
        panic!("expected vector");
    };
    assert_eq!(copied.len(), 2);
    assert!(!copied.contains(&one));

    *h.get_mut(copied[0]).unwrap() = Value::Int(100);
    assert_eq!(h.get(one).unwrap(), &Value::Int(1));
}

#[test]
fn free_cascades_counts_not_memory() {
    let mut h = heap();
    let one = h.alloc(Value::Int(1)).unwrap();
    let v = h.alloc_vector(&[one]).unwrap();
    assert_eq!(h.refs(one), Some(1));

    h.free_index(v.index());
    assert!(h.contains(one));
    assert_eq!(h.refs(one), Some(0));
}

#[test]
fn release_temporary_only_frees_unheld_garbage() {
    let mut h = heap();
    let t = h.alloc(Value::Int(1)).unwrap();
    let held = h.alloc(Value::Int(2)).unwrap();
    h.incref(held);
    let k = h.intern(&Literal::Int(9)).unwrap();
    let pinned = h.alloc(Value::Int(4)).unwrap();
    h.pin(pinned);

    assert!(h.release_temporary(t));
    assert!(!h.release_temporary(held));
    assert!(!h.release_temporary(k));
    assert!(!h.release_temporary(pinned));
    assert!(!h.release_temporary(t));
}

#[test]
fn resolve_follows_references() {
    let mut h = heap();
    let target = h.alloc(Value::Int(7)).unwrap();
    h.incref(target);
    let r1 = h.alloc(Value::Reference(target)).unwrap();
    h.incref(r1);
    let r2 = h.alloc(Value::Reference(r1)).unwrap();
    assert_eq!(h.resolve(r2).unwrap(), target);
    assert_eq!(h.resolve(target).unwrap(), target);
}

#[test]
fn temporaries_of_other_live_mutators_are_not_reclaimable() {
    let mut h = heap();
    h.live_mutators.insert(1);
    h.live_mutators.insert(2);
    h.owner = 1;
    let mine = h.alloc(Value::Int(1)).unwrap();
    h.owner = 2;
    assert!(!h.release_temporary(mine));
    h.live_mutators.remove(&1);
    assert!(h.release_temporary(mine));
}

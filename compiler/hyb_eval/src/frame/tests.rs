use super::*;
use hyb_ir::Literal;
use hyb_value::{CollectorConfig, Heap, Value};
use pretty_assertions::assert_eq;

fn heap() -> Heap {
    Heap::new(CollectorConfig::default())
}

fn int(heap: &Heap, id: ValueId) -> i64 {
    match heap.get(id).unwrap() {
        Value::Int(n) => *n,
        other => panic!("expected integer, got {other:?}"),
    }
}

#[test]
fn add_moves_unheld_temporaries() {
    let mut heap = heap();
    let mut frame = Frame::new();
    let temp = heap.alloc(Value::Int(4)).unwrap();
    let stored = frame.add(&mut heap, Name::new("x"), temp).unwrap();
    assert_eq!(stored, temp);
    assert_eq!(heap.refs(temp), Some(1));
    assert_eq!(frame.get("x"), Some(temp));
}

#[test]
fn add_copies_constants_and_held_values() {
    let mut heap = heap();
    let mut frame = Frame::new();
    let constant = heap.intern(&Literal::Int(7)).unwrap();
    let x = frame.add(&mut heap, Name::new("x"), constant).unwrap();
    assert_ne!(x, constant);
    let y = frame.add(&mut heap, Name::new("y"), x).unwrap();
    assert_ne!(y, x);
    assert_eq!(int(&heap, y), 7);
    assert_eq!(heap.refs(x), Some(1));
}

#[test]
fn rebinding_decrements_the_old_value() {
    let mut heap = heap();
    let mut frame = Frame::new();
    let first = heap.alloc(Value::Int(1)).unwrap();
    frame.add(&mut heap, Name::new("x"), first).unwrap();
    let second = heap.alloc(Value::Int(2)).unwrap();
    frame.add(&mut heap, Name::new("x"), second).unwrap();
    assert_eq!(heap.refs(first), Some(0));
    assert_eq!(frame.len(), 1);
    assert_eq!(int(&heap, frame.get("x").unwrap()), 2);
}

#[test]
fn assignment_through_a_reference_writes_the_target() {
    let mut heap = heap();
    let mut frame = Frame::new();
    let target = heap.alloc(Value::Int(1)).unwrap();
    let target = frame.add(&mut heap, Name::new("x"), target).unwrap();
    let reference = heap.alloc(Value::Reference(target)).unwrap();
    heap.incref(target);
    frame.add(&mut heap, Name::new("p"), reference).unwrap();

    let value = heap.alloc(Value::Int(42)).unwrap();
    let written = frame.add(&mut heap, Name::new("p"), value).unwrap();
    assert_eq!(written, target);
    assert_eq!(int(&heap, frame.get("x").unwrap()), 42);
    assert!(matches!(
        heap.get(frame.get("p").unwrap()).unwrap(),
        Value::Reference(_)
    ));
}

#[test]
fn reference_to_a_constant_is_rebound_not_written() {
    let mut heap = heap();
    let mut frame = Frame::new();
    let constant = heap.intern(&Literal::Int(5)).unwrap();
    let reference = heap.alloc(Value::Reference(constant)).unwrap();
    frame.add(&mut heap, Name::new("p"), reference).unwrap();

    let value = heap.alloc(Value::Int(7)).unwrap();
    let stored = frame.add(&mut heap, Name::new("p"), value).unwrap();
    assert_eq!(int(&heap, constant), 5);
    assert_eq!(frame.get("p"), Some(stored));
    assert_eq!(int(&heap, stored), 7);
}

#[test]
fn insert_binds_by_identity() {
    let mut heap = heap();
    let mut frame = Frame::new();
    let value = heap.alloc(Value::Int(3)).unwrap();
    heap.incref(value);
    frame.insert(&mut heap, Name::new("me"), value);
    assert_eq!(frame.get("me"), Some(value));
    assert_eq!(heap.refs(value), Some(2));
}

#[test]
fn push_uses_positional_labels() {
    let mut heap = heap();
    let mut frame = Frame::new();
    for n in 0..3 {
        let v = heap.alloc(Value::Int(n)).unwrap();
        frame.push(&mut heap, v).unwrap();
    }
    let names: Vec<String> = frame.iter().map(|(n, _)| n.to_string()).collect();
    assert_eq!(
        names,
        vec![
            "HANONYMOUSIDENTIFIER0",
            "HANONYMOUSIDENTIFIER1",
            "HANONYMOUSIDENTIFIER2"
        ]
    );
}

#[test]
fn bindings_keep_insertion_order() {
    let mut heap = heap();
    let mut frame = Frame::new();
    for name in ["zeta", "alpha", "mid"] {
        let v = heap.alloc(Value::Bool(true)).unwrap();
        frame.add(&mut heap, Name::new(name), v).unwrap();
    }
    let names: Vec<&str> = frame.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn clone_frame_is_independent() {
    let mut heap = heap();
    let mut frame = Frame::with_owner(FrameOwner::function(Name::new("f")));
    let v = heap.alloc(Value::Int(1)).unwrap();
    frame.add(&mut heap, Name::new("x"), v).unwrap();

    let mut copy = frame.clone_frame(&mut heap).unwrap();
    assert_eq!(copy.owner(), frame.owner());
    let replacement = heap.alloc(Value::Int(99)).unwrap();
    copy.add(&mut heap, Name::new("x"), replacement).unwrap();

    assert_eq!(int(&heap, frame.get("x").unwrap()), 1);
    assert_eq!(int(&heap, copy.get("x").unwrap()), 99);
}

#[test]
fn release_decrements_every_binding() {
    let mut heap = heap();
    let mut frame = Frame::new();
    let a = heap.alloc(Value::Int(1)).unwrap();
    let a = frame.add(&mut heap, Name::new("a"), a).unwrap();
    let b = heap.alloc(Value::Int(2)).unwrap();
    let b = frame.add(&mut heap, Name::new("b"), b).unwrap();
    frame.release(&mut heap).unwrap();
    assert!(frame.is_empty());
    assert_eq!(heap.refs(a), Some(0));
    assert_eq!(heap.refs(b), Some(0));
}

#[test]
fn release_with_pending_exception_is_fatal() {
    let mut heap = heap();
    let mut frame = Frame::new();
    let exc = heap.alloc_str("boom").unwrap();
    frame.raise(&mut heap, exc);
    assert_eq!(heap.refs(exc), Some(1));
    let err = frame.release(&mut heap).unwrap_err();
    assert_eq!(err.message, "unhandled exception: boom");
    assert!(!frame.state.has_exception());
    assert_eq!(heap.refs(exc), Some(0));
}

#[test]
fn control_state_records_signals() {
    let mut state = ControlState::default();
    state.record(Flow::Normal(None));
    assert_eq!(state.flags, ControlFlags::empty());
    state.record(Flow::Break);
    state.record(Flow::Return(None));
    assert!(state.flags.contains(ControlFlags::BREAK | ControlFlags::RETURN));
    state.clear();
    assert_eq!(state, ControlState::default());
}

//! Tests for the debugger hook.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hyb_ir::build::{assign, call, function, ident, int, seq, string};
use hyb_ir::{Name, Node, NodeKind};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use crate::{buffer_handler, DebugAction, DebugHook, Engine, FrameView};

/// What the hook saw at a `print` call.
#[derive(Debug, PartialEq)]
struct Sighting {
    depth: usize,
    function: Option<Name>,
    x: Option<String>,
}

#[derive(Default)]
struct Recorder {
    sightings: Mutex<Vec<Sighting>>,
    triggers: AtomicUsize,
    resumes: AtomicUsize,
    stop_on_assign: bool,
}

impl DebugHook for Recorder {
    fn trigger(&self, view: &FrameView<'_>, node: &Node) -> DebugAction {
        self.triggers.fetch_add(1, Ordering::Relaxed);
        match &node.kind {
            NodeKind::Call(name) if name.as_str() == "print" => {
                self.sightings.lock().push(Sighting {
                    depth: view.depth(),
                    function: view.function(),
                    x: view.lookup("x"),
                });
                DebugAction::Continue
            }
            NodeKind::Expression(_) if self.stop_on_assign => DebugAction::Stop,
            _ => DebugAction::Continue,
        }
    }

    fn wait_for_resume(&self) {
        self.resumes.fetch_add(1, Ordering::Relaxed);
    }
}

fn engine_with(hook: Arc<Recorder>) -> Arc<Engine> {
    Engine::builder()
        .print_handler(buffer_handler())
        .debugger(hook)
        .build()
        .unwrap()
}

#[test]
fn hook_sees_every_node_with_its_scope() {
    let hook = Arc::new(Recorder::default());
    let engine = engine_with(Arc::clone(&hook));
    let root = seq(vec![
        function("show", &["x"], call("print", vec![ident("x")])),
        call("show", vec![int(5)]),
        assign("x", string("global")),
        call("print", vec![ident("x")]),
    ]);
    engine.run(&root).unwrap();

    let sightings = hook.sightings.lock();
    assert_eq!(
        *sightings,
        vec![
            Sighting {
                depth: 1,
                function: Some(Name::new("show")),
                x: Some("5".to_string()),
            },
            Sighting {
                depth: 0,
                function: None,
                x: Some("global".to_string()),
            },
        ]
    );
    assert!(hook.triggers.load(Ordering::Relaxed) > sightings.len());
    assert_eq!(engine.print().get_output(), "5global");
}

#[test]
fn stop_waits_for_resume() {
    let hook = Arc::new(Recorder {
        stop_on_assign: true,
        ..Recorder::default()
    });
    let engine = engine_with(Arc::clone(&hook));
    let root = seq(vec![assign("a", int(1)), assign("b", int(2))]);
    engine.run(&root).unwrap();
    assert_eq!(hook.resumes.load(Ordering::Relaxed), 2);
}

//! Statements: sequences, loops, branches and exception handling.

use hyb_ir::{Node, NodeKind, StmtOp};
use hyb_value::errors::malformed;
use hyb_value::ops::{self, truthy, values_equal};
use hyb_value::{EvalResult, PinGuard, ValueId};
use tracing::trace;

use super::expr::{child, identifier};
use super::Interpreter;
use crate::flow::{unwind, Flow};

/// What a loop does after one run of its body.
enum Step {
    Continue,
    Exit,
    Propagate(Flow),
}

impl Interpreter {
    pub(super) fn eval_statement(&mut self, op: StmtOp, node: &Node) -> EvalResult<Flow> {
        match op {
            StmtOp::Sequence => self.eval_sequence(node),
            StmtOp::While => self.eval_while(node),
            StmtOp::DoWhile => self.eval_do_while(node),
            StmtOp::For => self.eval_for(node),
            StmtOp::Foreach => self.eval_foreach(node),
            StmtOp::ForeachMap => self.eval_foreach_map(node),
            StmtOp::If => self.eval_if(node),
            StmtOp::Switch => self.eval_switch(node),
            StmtOp::Break => Ok(Flow::Break),
            StmtOp::Next => Ok(Flow::Next),
            StmtOp::Return => match node.child(0) {
                None => Ok(Flow::Return(None)),
                Some(value) => {
                    let value = unwind!(self.eval(value)?.into_value());
                    Ok(Flow::Return(value))
                }
            },
            StmtOp::Throw => {
                let value = unwind!(self.eval_value(child(node, 0)?, "thrown value")?);
                Ok(Flow::Raised(value))
            }
            StmtOp::TryCatch => self.eval_try_catch(node),
        }
    }

    /// Drop the value of a completed statement.
    fn settle(&self, flow: Flow) -> Flow {
        match flow {
            Flow::Normal(Some(v)) => {
                self.release_temps(&[v], None);
                Flow::Normal(None)
            }
            other => other,
        }
    }

    fn loop_step(&self, flow: Flow) -> Step {
        match flow {
            Flow::Normal(v) => {
                if let Some(v) = v {
                    self.release_temps(&[v], None);
                }
                Step::Continue
            }
            Flow::Next => Step::Continue,
            Flow::Break => Step::Exit,
            signal => Step::Propagate(signal),
        }
    }

    fn eval_condition(&mut self, node: &Node) -> EvalResult<Result<bool, Flow>> {
        let value = match self.eval_value(node, "condition")? {
            Ok(value) => value,
            Err(signal) => return Ok(Err(signal)),
        };
        let holds = truthy(&self.mutator.heap(), value)?;
        self.release_temps(&[value], None);
        Ok(Ok(holds))
    }

    /// Children in order. The last statement's value is the sequence's
    /// value; a collection may run between statements.
    fn eval_sequence(&mut self, node: &Node) -> EvalResult<Flow> {
        let mut last: Option<ValueId> = None;
        for (i, statement) in node.children.iter().enumerate() {
            if let Some(previous) = last.take() {
                self.release_temps(&[previous], None);
            }
            if i > 0 {
                self.maybe_collect();
            }
            match self.eval(statement)? {
                Flow::Normal(v) => last = v,
                signal => return Ok(signal),
            }
        }
        Ok(Flow::Normal(last))
    }

    fn eval_while(&mut self, node: &Node) -> EvalResult<Flow> {
        let (condition, body) = (child(node, 0)?, child(node, 1)?);
        loop {
            if !unwind!(self.eval_condition(condition)?) {
                return Ok(Flow::Normal(None));
            }
            let flow = self.eval(body)?;
            match self.loop_step(flow) {
                Step::Continue => {}
                Step::Exit => return Ok(Flow::Normal(None)),
                Step::Propagate(signal) => return Ok(signal),
            }
            self.maybe_collect();
        }
    }

    fn eval_do_while(&mut self, node: &Node) -> EvalResult<Flow> {
        let (body, condition) = (child(node, 0)?, child(node, 1)?);
        loop {
            let flow = self.eval(body)?;
            match self.loop_step(flow) {
                Step::Continue => {}
                Step::Exit => return Ok(Flow::Normal(None)),
                Step::Propagate(signal) => return Ok(signal),
            }
            self.maybe_collect();
            if !unwind!(self.eval_condition(condition)?) {
                return Ok(Flow::Normal(None));
            }
        }
    }

    fn eval_for(&mut self, node: &Node) -> EvalResult<Flow> {
        let (init, condition, step, body) = (
            child(node, 0)?,
            child(node, 1)?,
            child(node, 2)?,
            child(node, 3)?,
        );
        let initial = self.eval(init)?;
        unwind!(self.settle(initial).into_value());
        loop {
            if !unwind!(self.eval_condition(condition)?) {
                return Ok(Flow::Normal(None));
            }
            let flow = self.eval(body)?;
            match self.loop_step(flow) {
                Step::Continue => {}
                Step::Exit => return Ok(Flow::Normal(None)),
                Step::Propagate(signal) => return Ok(signal),
            }
            let stepped = self.eval(step)?;
            unwind!(self.settle(stepped).into_value());
            self.maybe_collect();
        }
    }

    /// `foreach (x of iterable)`: binds each element in order. Every
    /// element stays pinned until the loop ends, since the body may drop
    /// it from the container.
    fn eval_foreach(&mut self, node: &Node) -> EvalResult<Flow> {
        let var = identifier(node, 0)?;
        let body = child(node, 2)?;
        let iterable = unwind!(self.eval_value(child(node, 1)?, "foreach iterable")?);
        let iterable_pin = self.pin(iterable);
        let items = ops::iteration_items(&mut self.mutator.heap(), iterable)?;
        let item_pins: Vec<PinGuard> = items.iter().map(|&item| self.pin(item)).collect();

        let mut outcome = Flow::Normal(None);
        for &item in &items {
            self.bind(var, item)?;
            let flow = self.eval(body)?;
            match self.loop_step(flow) {
                Step::Continue => {}
                Step::Exit => break,
                Step::Propagate(signal) => {
                    outcome = signal;
                    break;
                }
            }
            self.maybe_collect();
        }

        drop(item_pins);
        drop(iterable_pin);
        self.release_temps(&items, outcome.payload());
        self.release_temps(&[iterable], outcome.payload());
        Ok(outcome)
    }

    /// `foreach (k => v of map)`: binds key and value pairs in insertion
    /// order.
    fn eval_foreach_map(&mut self, node: &Node) -> EvalResult<Flow> {
        let key_var = identifier(node, 0)?;
        let value_var = identifier(node, 1)?;
        let body = child(node, 3)?;
        let map = unwind!(self.eval_value(child(node, 2)?, "foreach map")?);
        let map_pin = self.pin(map);
        let pairs = ops::map_pairs(&self.mutator.heap(), map)?;
        let pair_pins: Vec<(PinGuard, PinGuard)> = pairs
            .iter()
            .map(|&(k, v)| (self.pin(k), self.pin(v)))
            .collect();

        let mut outcome = Flow::Normal(None);
        for &(key, value) in &pairs {
            self.bind(key_var, key)?;
            self.bind(value_var, value)?;
            let flow = self.eval(body)?;
            match self.loop_step(flow) {
                Step::Continue => {}
                Step::Exit => break,
                Step::Propagate(signal) => {
                    outcome = signal;
                    break;
                }
            }
            self.maybe_collect();
        }

        drop(pair_pins);
        drop(map_pin);
        self.release_temps(&[map], outcome.payload());
        Ok(outcome)
    }

    fn eval_if(&mut self, node: &Node) -> EvalResult<Flow> {
        let holds = unwind!(self.eval_condition(child(node, 0)?)?);
        let branch = if holds { node.child(1) } else { node.child(2) };
        match branch {
            Some(branch) => {
                let flow = self.eval(branch)?;
                Ok(self.settle(flow))
            }
            None => Ok(Flow::Normal(None)),
        }
    }

    /// Case values are compared with the discriminant in declaration order;
    /// the first match runs, else the default arm if there is one. A
    /// `break` inside the chosen arm ends the switch.
    fn eval_switch(&mut self, node: &Node) -> EvalResult<Flow> {
        let discriminant = unwind!(self.eval_value(child(node, 0)?, "switch value")?);
        let discriminant_pin = self.pin(discriminant);
        let mut chosen: Option<&Node> = None;
        let mut default: Option<&Node> = None;
        for arm in node.children.iter().skip(1) {
            match arm.kind {
                NodeKind::Case => {
                    let value = unwind!(self.eval_value(child(arm, 0)?, "case value")?);
                    let matched = values_equal(&self.mutator.heap(), discriminant, value)?;
                    self.release_temps(&[value], None);
                    if matched {
                        chosen = Some(child(arm, 1)?);
                        break;
                    }
                }
                NodeKind::DefaultCase => default = Some(child(arm, 0)?),
                _ => return Err(malformed("switch arm is not a case")),
            }
        }
        let flow = match chosen.or(default) {
            Some(body) => self.eval(body)?,
            None => Flow::Normal(None),
        };
        drop(discriminant_pin);
        self.release_temps(&[discriminant], flow.payload());
        Ok(match flow {
            Flow::Break => Flow::Normal(None),
            other => self.settle(other),
        })
    }

    /// Runs the body; a raised exception is bound to the catch variable and
    /// the handler runs exactly once.
    fn eval_try_catch(&mut self, node: &Node) -> EvalResult<Flow> {
        match self.eval(child(node, 0)?)? {
            Flow::Raised(exception) => {
                let var = identifier(node, 1)?;
                trace!(var = %var, "exception caught");
                let stored = self.bind(var, exception)?;
                if stored != exception {
                    self.release_temps(&[exception], None);
                }
                let handled = self.eval(child(node, 2)?)?;
                Ok(self.settle(handled))
            }
            flow => Ok(self.settle(flow)),
        }
    }
}

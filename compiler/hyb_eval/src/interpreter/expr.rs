//! Expression operators.

use hyb_ir::{BinaryOp, ExprOp, Literal, Name, Node, UnaryOp};
use hyb_value::errors::{malformed, type_mismatch, undeclared_identifier};
use hyb_value::ops::{self, display, truthy};
use hyb_value::{AliasTarget, EvalResult, Heap, Value, ValueId};

use super::{Interpreter, Scope};
use crate::flow::{unwind, Flow};

/// Child `index` of a well-formed node.
pub(super) fn child(node: &Node, index: usize) -> EvalResult<&Node> {
    node.child(index).ok_or_else(|| {
        malformed(&format!(
            "{} node is missing child {index}",
            node.kind.label()
        ))
    })
}

/// Identifier at child `index`.
pub(super) fn identifier(node: &Node, index: usize) -> EvalResult<&Name> {
    child(node, index)?
        .as_identifier()
        .ok_or_else(|| malformed("expected an identifier"))
}

/// Constants are never written in place.
fn ensure_mutable(heap: &Heap, id: ValueId) -> EvalResult<()> {
    if heap.is_constant(id) {
        Err(type_mismatch("variable", "constant"))
    } else {
        Ok(())
    }
}

impl Interpreter {
    pub(super) fn eval_expression(&mut self, op: ExprOp, node: &Node) -> EvalResult<Flow> {
        if node.len() < op.arity() {
            return Err(malformed(&format!(
                "operator '{}' expects {} operands",
                op.describe(),
                op.arity()
            )));
        }
        match op {
            ExprOp::Assign => self.eval_assign(node),
            ExprOp::CompoundAssign(op) => self.eval_compound(op, node),
            ExprOp::Inc => self.eval_step(BinaryOp::Add, node),
            ExprOp::Dec => self.eval_step(BinaryOp::Sub, node),
            ExprOp::Binary(op) => self.eval_binary(op, node),
            ExprOp::Unary(op) => self.eval_unary(op, node),
            ExprOp::Ternary => self.eval_ternary(node),
            ExprOp::Dollar => self.eval_dollar(node),
            ExprOp::AddressOf => self.eval_address_of(node),
            ExprOp::Deref => self.eval_deref(node),
            ExprOp::Range => self.eval_range(node),
            ExprOp::SubscriptAdd => self.eval_subscript_add(node),
            ExprOp::SubscriptGet => self.eval_subscript_get(node),
            ExprOp::SubscriptSet => self.eval_subscript_set(node),
            ExprOp::Dot => self.eval_dot(node),
            ExprOp::DotAssign => self.eval_dot_assign(node),
        }
    }

    /// Variable, then declared function (as an alias), else undeclared.
    pub(super) fn eval_identifier(&mut self, name: &Name) -> EvalResult<Flow> {
        if let Some((_, id)) = self.lookup(name.as_str()) {
            return Ok(Flow::Normal(Some(id)));
        }
        let index = self.engine.code().read().index_of(name.as_str());
        match index {
            Some(index) => {
                let alias = self
                    .mutator
                    .heap()
                    .alloc(Value::Alias(AliasTarget::Function(index)))?;
                Ok(Flow::Normal(Some(alias)))
            }
            None => Err(undeclared_identifier(name.as_str())),
        }
    }

    fn eval_assign(&mut self, node: &Node) -> EvalResult<Flow> {
        let name = identifier(node, 0)?;
        let value = unwind!(self.eval_value(child(node, 1)?, "assigned value")?);
        let stored = self.bind(name, value)?;
        if stored != value {
            self.release_temps(&[value], None);
        }
        Ok(Flow::Normal(Some(stored)))
    }

    /// `x op= value`: the target must already be bound. It is rebound in
    /// the frame it was found in.
    fn eval_compound(&mut self, op: BinaryOp, node: &Node) -> EvalResult<Flow> {
        let name = identifier(node, 0)?;
        let operand = unwind!(self.eval_value(child(node, 1)?, "assigned value")?);
        let (scope, current) = self
            .lookup(name.as_str())
            .ok_or_else(|| undeclared_identifier(name.as_str()))?;
        self.rebind_result(scope, name, op, current, operand)
    }

    /// `x++` / `x--`.
    fn eval_step(&mut self, op: BinaryOp, node: &Node) -> EvalResult<Flow> {
        let name = identifier(node, 0)?;
        let (scope, current) = self
            .lookup(name.as_str())
            .ok_or_else(|| undeclared_identifier(name.as_str()))?;
        let one = self.mutator.heap().intern(&Literal::Int(1))?;
        self.rebind_result(scope, name, op, current, one)
    }

    fn rebind_result(
        &mut self,
        scope: Scope,
        name: &Name,
        op: BinaryOp,
        current: ValueId,
        operand: ValueId,
    ) -> EvalResult<Flow> {
        let result = ops::binary(&mut self.mutator.heap(), op, current, operand)?;
        let stored = self.with_frame(scope, |frame, heap| frame.add(heap, name.clone(), result))?;
        self.release_temps(&[operand, result], Some(stored));
        Ok(Flow::Normal(Some(stored)))
    }

    fn eval_binary(&mut self, op: BinaryOp, node: &Node) -> EvalResult<Flow> {
        let left = unwind!(self.eval_value(child(node, 0)?, "left operand")?);
        let right = {
            let _left = self.pin(left);
            unwind!(self.eval_value(child(node, 1)?, "right operand")?)
        };
        let result = ops::binary(&mut self.mutator.heap(), op, left, right)?;
        self.release_temps(&[left, right], Some(result));
        Ok(Flow::Normal(Some(result)))
    }

    fn eval_unary(&mut self, op: UnaryOp, node: &Node) -> EvalResult<Flow> {
        let operand = unwind!(self.eval_value(child(node, 0)?, "operand")?);
        let result = ops::unary(&mut self.mutator.heap(), op, operand)?;
        self.release_temps(&[operand], Some(result));
        Ok(Flow::Normal(Some(result)))
    }

    fn eval_ternary(&mut self, node: &Node) -> EvalResult<Flow> {
        let condition = unwind!(self.eval_value(child(node, 0)?, "condition")?);
        let taken = truthy(&self.mutator.heap(), condition)?;
        self.release_temps(&[condition], None);
        self.eval(child(node, if taken { 1 } else { 2 })?)
    }

    /// `$expr`: the variable named by the printed value of `expr`.
    fn eval_dollar(&mut self, node: &Node) -> EvalResult<Flow> {
        let value = unwind!(self.eval_value(child(node, 0)?, "variable name")?);
        let name = display(&self.mutator.heap(), value)?;
        self.release_temps(&[value], None);
        match self.lookup(&name) {
            Some((_, id)) => Ok(Flow::Normal(Some(id))),
            None => Err(undeclared_identifier(&name)),
        }
    }

    /// `&x`: a reference to the slot `x` evaluates to. Function names
    /// already evaluate to an alias, which is returned as is.
    fn eval_address_of(&mut self, node: &Node) -> EvalResult<Flow> {
        let target = unwind!(self.eval_value(child(node, 0)?, "address-of operand")?);
        let mut heap = self.mutator.heap();
        if matches!(heap.get(target)?, Value::Alias(AliasTarget::Function(_))) {
            return Ok(Flow::Normal(Some(target)));
        }
        // `&5` points at a private copy, never into the constant pool.
        let target = if heap.is_constant(target) {
            heap.deep_clone(target)?
        } else {
            target
        };
        let reference = heap.alloc(Value::Reference(target))?;
        heap.incref(target);
        Ok(Flow::Normal(Some(reference)))
    }

    /// `*p`: the slot a reference or value alias points at.
    fn eval_deref(&mut self, node: &Node) -> EvalResult<Flow> {
        let pointer = unwind!(self.eval_value(child(node, 0)?, "dereference operand")?);
        let heap = self.mutator.heap();
        let target = match heap.get(pointer)? {
            Value::Reference(target) | Value::Alias(AliasTarget::Value(target)) => *target,
            Value::Alias(AliasTarget::Function(_)) => pointer,
            other => return Err(type_mismatch("reference", other.type_name())),
        };
        Ok(Flow::Normal(Some(target)))
    }

    fn eval_range(&mut self, node: &Node) -> EvalResult<Flow> {
        let from = unwind!(self.eval_value(child(node, 0)?, "range start")?);
        let to = {
            let _from = self.pin(from);
            unwind!(self.eval_value(child(node, 1)?, "range end")?)
        };
        let range = ops::range(&mut self.mutator.heap(), from, to)?;
        self.release_temps(&[from, to], None);
        Ok(Flow::Normal(Some(range)))
    }

    /// `a[] = value`.
    fn eval_subscript_add(&mut self, node: &Node) -> EvalResult<Flow> {
        let container = unwind!(self.eval_value(child(node, 0)?, "subscript target")?);
        ensure_mutable(&self.mutator.heap(), container)?;
        let value = {
            let _container = self.pin(container);
            unwind!(self.eval_value(child(node, 1)?, "appended value")?)
        };
        ops::subscript_add(&mut self.mutator.heap(), container, value)?;
        self.release_temps(&[value], None);
        Ok(Flow::Normal(Some(container)))
    }

    /// `a[i]`. Reads return the stored element itself.
    fn eval_subscript_get(&mut self, node: &Node) -> EvalResult<Flow> {
        let container = unwind!(self.eval_value(child(node, 0)?, "subscript target")?);
        let index = {
            let _container = self.pin(container);
            unwind!(self.eval_value(child(node, 1)?, "index")?)
        };
        let bounds_check = self.engine.config().bounds_check;
        let mut heap = self.mutator.heap();
        let element = ops::subscript_get(&mut heap, container, index, bounds_check)?;
        if Some(index) != element {
            heap.release_temporary(index);
        }
        // Reading out of a temporary container hands the element over.
        if heap.release_temporary(container) {
            if let Some(element) = element {
                heap.claim(element);
            }
        }
        Ok(Flow::Normal(element))
    }

    /// `a[i] = value`.
    fn eval_subscript_set(&mut self, node: &Node) -> EvalResult<Flow> {
        let container = unwind!(self.eval_value(child(node, 0)?, "subscript target")?);
        ensure_mutable(&self.mutator.heap(), container)?;
        let container_pin = self.pin(container);
        let index = unwind!(self.eval_value(child(node, 1)?, "index")?);
        let index_pin = self.pin(index);
        let value = unwind!(self.eval_value(child(node, 2)?, "assigned value")?);
        ops::subscript_set(&mut self.mutator.heap(), container, index, value)?;
        drop(index_pin);
        self.release_temps(&[index, value], None);
        drop(container_pin);
        Ok(Flow::Normal(Some(container)))
    }

    /// `object.member`.
    fn eval_dot(&mut self, node: &Node) -> EvalResult<Flow> {
        let object = unwind!(self.eval_value(child(node, 0)?, "member access")?);
        let member = identifier(node, 1)?;
        self.check_member_access(object, member)?;
        let mut heap = self.mutator.heap();
        let field = ops::dot_get(&heap, object, member.as_str())?;
        if heap.release_temporary(object) {
            heap.claim(field);
        }
        Ok(Flow::Normal(Some(field)))
    }

    /// `object.member = value`.
    fn eval_dot_assign(&mut self, node: &Node) -> EvalResult<Flow> {
        let object = unwind!(self.eval_value(child(node, 0)?, "member access")?);
        let member = identifier(node, 1)?;
        self.check_member_access(object, member)?;
        let value = {
            let _object = self.pin(object);
            unwind!(self.eval_value(child(node, 2)?, "assigned value")?)
        };
        ops::dot_set(&mut self.mutator.heap(), object, member.as_str(), value)?;
        self.release_temps(&[value], None);
        Ok(Flow::Normal(Some(object)))
    }
}

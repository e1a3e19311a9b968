//! Structures, classes, instantiation and methods.

use hyb_ir::{Access, Literal, Name, Node};
use hyb_value::errors::{
    arity_mismatch, not_structured, private_member, undefined_member, unknown_type,
};
use hyb_value::ops::dot_set;
use hyb_value::{EvalResult, Instance, Value, ValueId};
use tracing::trace;

use super::expr::child;
use super::Interpreter;
use crate::flow::{unwind, Flow};
use crate::segments::{TypeKind, TypeTemplate};

const CONSTRUCTOR: &str = "__construct";

impl Interpreter {
    pub(super) fn declare_type(&mut self, node: &Node) -> EvalResult<Flow> {
        let template = TypeTemplate::from_node(node)?;
        let template = self.engine.types().write().define(template)?;
        trace!(type_name = %template.name, mro = ?template.mro, "type declared");
        Ok(Flow::Normal(None))
    }

    /// `new T(args...)`.
    ///
    /// The instance starts with every attribute of its layout at its
    /// default. A class with a `__construct` method along its MRO runs it
    /// with `me` bound to the instance; otherwise the arguments fill the
    /// attributes in layout order.
    pub(super) fn eval_new(&mut self, name: &Name, node: &Node) -> EvalResult<Flow> {
        let (template, layout) = {
            let types = self.engine.types().read();
            let template = types
                .get(name.as_str())
                .ok_or_else(|| unknown_type(name.as_str()))?;
            (template, types.layout(name.as_str()))
        };

        let mut defaults = Vec::with_capacity(layout.len());
        let mut default_pins = Vec::with_capacity(layout.len());
        for member in &layout {
            let value = match &member.default {
                Some(default) => unwind!(self.eval_value(default, "attribute default")?),
                None => self.mutator.heap().intern(&Literal::Int(0))?,
            };
            default_pins.push(self.pin(value));
            defaults.push(value);
        }

        let instance = {
            let mut heap = self.mutator.heap();
            let mut object = Instance::new(name.clone());
            for (member, &value) in layout.iter().zip(&defaults) {
                object.fields.push((member.name.clone(), heap.adopt(value)?));
            }
            heap.alloc(match template.kind {
                TypeKind::Struct => Value::Struct(object),
                TypeKind::Class => Value::Class(object),
            })?
        };
        drop(default_pins);
        self.release_temps(&defaults, None);

        let instance_pin = self.pin(instance);
        let args = unwind!(self.eval_arguments(&node.children)?);
        let constructor = match template.kind {
            TypeKind::Class => self
                .engine
                .types()
                .read()
                .find_method(name.as_str(), CONSTRUCTOR),
            TypeKind::Struct => None,
        };

        match constructor {
            Some(constructor) => {
                let flow = self.call_user(&constructor, args, Some(instance), node.span)?;
                drop(instance_pin);
                // The constructor's frame held the instance; hand it back.
                self.mutator.heap().claim(instance);
                match flow {
                    Flow::Raised(exception) => {
                        self.release_temps(&[instance], None);
                        Ok(Flow::Raised(exception))
                    }
                    flow => {
                        if let Some(v) = flow.payload() {
                            self.release_temps(&[v], Some(instance));
                        }
                        Ok(Flow::Normal(Some(instance)))
                    }
                }
            }
            None => {
                if args.len() > layout.len() {
                    return Err(arity_mismatch(name.as_str(), layout.len(), args.len()));
                }
                let values = args.unpin();
                {
                    let mut heap = self.mutator.heap();
                    for (member, &value) in layout.iter().zip(&values) {
                        dot_set(&mut heap, instance, member.name.as_str(), value)?;
                    }
                }
                self.release_temps(&values, None);
                drop(instance_pin);
                Ok(Flow::Normal(Some(instance)))
            }
        }
    }

    /// `receiver.method(args...)`: the first method along the receiver's
    /// MRO, run with `me` bound to the receiver.
    pub(super) fn eval_method_call(&mut self, method: &Name, node: &Node) -> EvalResult<Flow> {
        let receiver = unwind!(self.eval_value(child(node, 0)?, "method receiver")?);
        let receiver_pin = self.pin(receiver);
        let (target, type_name) = {
            let heap = self.mutator.heap();
            let target = heap.resolve(receiver)?;
            match heap.get(target)? {
                Value::Struct(inst) | Value::Class(inst) => (target, inst.type_name.clone()),
                other => return Err(not_structured(other.type_name())),
            }
        };

        let callable = self
            .engine
            .types()
            .read()
            .find_method(type_name.as_str(), method.as_str())
            .ok_or_else(|| undefined_member(method.as_str(), type_name.as_str()))?;
        if callable.access != Access::Public && !self.inside_type_of(&type_name) {
            return Err(private_member(method.as_str(), type_name.as_str()));
        }

        let args = unwind!(self.eval_arguments(node.children.get(1..).unwrap_or(&[]))?);
        let flow = self.call_user(&callable, args, Some(target), node.span)?;
        drop(receiver_pin);

        let mut heap = self.mutator.heap();
        heap.claim(target);
        let payload = flow.payload();
        if payload != Some(receiver) && heap.release_temporary(receiver) {
            if let Some(v) = payload {
                heap.claim(v);
            }
        }
        Ok(flow)
    }

    /// Non-public attributes are only reachable from methods of a type in
    /// the instance's MRO. Values that are not instances pass through; the
    /// access itself reports them.
    pub(super) fn check_member_access(&self, object: ValueId, member: &Name) -> EvalResult<()> {
        let type_name = {
            let heap = self.mutator.heap();
            let target = heap.resolve(object)?;
            match heap.get(target)? {
                Value::Struct(inst) | Value::Class(inst) => inst.type_name.clone(),
                _ => return Ok(()),
            }
        };
        let declared = self
            .engine
            .types()
            .read()
            .find_attribute(type_name.as_str(), member.as_str());
        match declared {
            Some(attr) if attr.access != Access::Public && !self.inside_type_of(&type_name) => {
                Err(private_member(member.as_str(), type_name.as_str()))
            }
            _ => Ok(()),
        }
    }

    /// Whether a method of some type in `instance_type`'s MRO is running.
    fn inside_type_of(&self, instance_type: &Name) -> bool {
        self.current_type().is_some_and(|current| {
            self.engine
                .types()
                .read()
                .inherits(instance_type.as_str(), current.as_str())
        })
    }
}

//! Constructor helpers.
//!
//! The parser lives outside this workspace, so embedders and tests assemble
//! trees through these functions instead of spelling out `Node` literals.

use super::{Access, BinaryOp, ExprOp, Literal, Node, NodeKind, StmtOp, UnaryOp};
use crate::Name;

pub fn int(n: i64) -> Node {
    Node::leaf(NodeKind::Constant(Literal::Int(n)))
}

pub fn float(f: f64) -> Node {
    Node::leaf(NodeKind::Constant(Literal::float(f)))
}

pub fn boolean(b: bool) -> Node {
    Node::leaf(NodeKind::Constant(Literal::Bool(b)))
}

pub fn chr(c: char) -> Node {
    Node::leaf(NodeKind::Constant(Literal::Char(c)))
}

pub fn string(s: &str) -> Node {
    Node::leaf(NodeKind::Constant(Literal::Str(s.to_string())))
}

pub fn ident(name: &str) -> Node {
    Node::leaf(NodeKind::Identifier(Name::new(name)))
}

pub fn expr(op: ExprOp, children: Vec<Node>) -> Node {
    Node::new(NodeKind::Expression(op), children)
}

pub fn stmt(op: StmtOp, children: Vec<Node>) -> Node {
    Node::new(NodeKind::Statement(op), children)
}

pub fn assign(name: &str, value: Node) -> Node {
    expr(ExprOp::Assign, vec![ident(name), value])
}

pub fn compound(name: &str, op: BinaryOp, value: Node) -> Node {
    expr(ExprOp::CompoundAssign(op), vec![ident(name), value])
}

pub fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Node {
    expr(ExprOp::Binary(op), vec![lhs, rhs])
}

pub fn unary(op: UnaryOp, operand: Node) -> Node {
    expr(ExprOp::Unary(op), vec![operand])
}

pub fn seq(children: Vec<Node>) -> Node {
    stmt(StmtOp::Sequence, children)
}

pub fn while_loop(cond: Node, body: Node) -> Node {
    stmt(StmtOp::While, vec![cond, body])
}

pub fn for_loop(init: Node, cond: Node, step: Node, body: Node) -> Node {
    stmt(StmtOp::For, vec![init, cond, step, body])
}

pub fn foreach(var: &str, iterable: Node, body: Node) -> Node {
    stmt(StmtOp::Foreach, vec![ident(var), iterable, body])
}

pub fn foreach_map(key: &str, value: &str, map: Node, body: Node) -> Node {
    stmt(StmtOp::ForeachMap, vec![ident(key), ident(value), map, body])
}

pub fn if_else(cond: Node, then: Node, otherwise: Option<Node>) -> Node {
    let mut children = vec![cond, then];
    children.extend(otherwise);
    stmt(StmtOp::If, children)
}

pub fn brk() -> Node {
    stmt(StmtOp::Break, Vec::new())
}

pub fn next() -> Node {
    stmt(StmtOp::Next, Vec::new())
}

pub fn ret(value: Option<Node>) -> Node {
    stmt(StmtOp::Return, value.into_iter().collect())
}

pub fn throw(value: Node) -> Node {
    stmt(StmtOp::Throw, vec![value])
}

pub fn try_catch(body: Node, var: &str, handler: Node) -> Node {
    stmt(StmtOp::TryCatch, vec![body, ident(var), handler])
}

pub fn switch(discriminant: Node, cases: Vec<(Node, Node)>, default: Option<Node>) -> Node {
    let mut children = Vec::with_capacity(cases.len() + 2);
    children.push(discriminant);
    for (value, body) in cases {
        children.push(Node::new(NodeKind::Case, vec![value, body]));
    }
    if let Some(body) = default {
        children.push(Node::new(NodeKind::DefaultCase, vec![body]));
    }
    stmt(StmtOp::Switch, children)
}

pub fn function(name: &str, params: &[&str], body: Node) -> Node {
    let mut children: Vec<Node> = params.iter().map(|p| ident(p)).collect();
    children.push(body);
    Node::new(NodeKind::Function(Name::new(name)), children)
}

pub fn call(name: &str, args: Vec<Node>) -> Node {
    Node::new(NodeKind::Call(Name::new(name)), args)
}

pub fn alias_call(callee: Node, args: Vec<Node>) -> Node {
    let mut children = Vec::with_capacity(args.len() + 1);
    children.push(callee);
    children.extend(args);
    Node::new(NodeKind::AliasCall, children)
}

pub fn method(name: &str, access: Access, params: &[&str], body: Node) -> Node {
    let mut children: Vec<Node> = params.iter().map(|p| ident(p)).collect();
    children.push(body);
    Node::new(
        NodeKind::Method {
            name: Name::new(name),
            access,
        },
        children,
    )
}

pub fn method_call(receiver: Node, name: &str, args: Vec<Node>) -> Node {
    let mut children = Vec::with_capacity(args.len() + 1);
    children.push(receiver);
    children.extend(args);
    Node::new(NodeKind::MethodCall(Name::new(name)), children)
}

pub fn attribute(name: &str, access: Access, default: Option<Node>) -> Node {
    Node::new(
        NodeKind::Attribute {
            name: Name::new(name),
            access,
        },
        default.into_iter().collect(),
    )
}

pub fn structure(name: &str, members: Vec<Node>) -> Node {
    Node::new(NodeKind::Struct(Name::new(name)), members)
}

pub fn class(name: &str, extends: &[&str], members: Vec<Node>) -> Node {
    Node::new(
        NodeKind::Class {
            name: Name::new(name),
            extends: extends.iter().map(|b| Name::new(b)).collect(),
        },
        members,
    )
}

pub fn new_instance(type_name: &str, args: Vec<Node>) -> Node {
    Node::new(NodeKind::New(Name::new(type_name)), args)
}

pub fn dot(object: Node, member: &str) -> Node {
    expr(ExprOp::Dot, vec![object, ident(member)])
}

pub fn dot_assign(object: Node, member: &str, value: Node) -> Node {
    expr(ExprOp::DotAssign, vec![object, ident(member), value])
}

pub fn subscript(container: Node, index: Node) -> Node {
    expr(ExprOp::SubscriptGet, vec![container, index])
}

pub fn subscript_set(name: &str, index: Node, value: Node) -> Node {
    expr(ExprOp::SubscriptSet, vec![ident(name), index, value])
}

pub fn subscript_add(name: &str, value: Node) -> Node {
    expr(ExprOp::SubscriptAdd, vec![ident(name), value])
}

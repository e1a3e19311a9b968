//! Code and type segments: the namespaces filled by declarations.
//!
//! Function bodies and type templates are stored behind `Arc` so a call can
//! clone its callee out of the segment and release the lock before the body
//! runs.

use std::sync::Arc;

use hyb_ir::{Access, Name, Node, NodeKind};
use hyb_value::errors::{malformed, type_redefined, unknown_type};
use hyb_value::EvalResult;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// A declared function or method.
#[derive(Clone, Debug)]
pub struct Callable {
    pub name: Name,
    pub params: SmallVec<[Name; 4]>,
    pub body: Arc<Node>,
    pub access: Access,
    /// Declaring type, for methods.
    pub owner: Option<Name>,
}

impl Callable {
    /// Build from a `Function` or `Method` declaration node.
    pub fn from_node(node: &Node, owner: Option<Name>) -> EvalResult<Self> {
        let (name, access) = match &node.kind {
            NodeKind::Function(name) => (name.clone(), Access::Public),
            NodeKind::Method { name, access } => (name.clone(), *access),
            _ => return Err(malformed("expected a function declaration")),
        };
        let (params, body) = node
            .callable_parts()
            .ok_or_else(|| malformed("function declaration without a body"))?;
        let params = params
            .iter()
            .map(|p| {
                p.as_identifier()
                    .cloned()
                    .ok_or_else(|| malformed("parameter is not an identifier"))
            })
            .collect::<EvalResult<SmallVec<[Name; 4]>>>()?;
        Ok(Callable {
            name,
            params,
            body: Arc::new(body.clone()),
            access,
            owner,
        })
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Whether `node` declares exactly this callable.
    pub fn matches_declaration(&self, node: &Node) -> bool {
        let Some((params, body)) = node.callable_parts() else {
            return false;
        };
        node.declared_name() == Some(&self.name)
            && params.len() == self.params.len()
            && params
                .iter()
                .zip(&self.params)
                .all(|(p, name)| p.as_identifier() == Some(name))
            && *self.body == *body
    }

    /// Copy with an independent body tree, for handing to another thread.
    #[must_use]
    pub fn snapshot(&self) -> Callable {
        Callable {
            body: Arc::new((*self.body).clone()),
            ..self.clone()
        }
    }
}

/// User-declared functions, addressable by name or by declaration index.
///
/// The index is what a function alias (`&f`) stores.
#[derive(Debug, Default)]
pub struct CodeSegment {
    functions: Vec<Arc<Callable>>,
    by_name: FxHashMap<Name, usize>,
}

impl CodeSegment {
    /// Register a function. Returns `None` when the name is taken.
    pub fn define(&mut self, callable: Callable) -> Option<usize> {
        if self.by_name.contains_key(&callable.name) {
            return None;
        }
        let index = self.functions.len();
        self.by_name.insert(callable.name.clone(), index);
        self.functions.push(Arc::new(callable));
        Some(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Callable>> {
        self.index_of(name).and_then(|i| self.by_index(i))
    }

    pub fn by_index(&self, index: usize) -> Option<Arc<Callable>> {
        self.functions.get(index).cloned()
    }

    /// Names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &Name> {
        self.functions.iter().map(|f| &f.name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Struct,
    Class,
}

/// A declared attribute.
#[derive(Clone, Debug)]
pub struct Member {
    pub name: Name,
    pub access: Access,
    /// Initializer evaluated at each instantiation.
    pub default: Option<Arc<Node>>,
    /// Type that declared the attribute.
    pub owner: Name,
}

/// A struct or class declaration.
#[derive(Debug)]
pub struct TypeTemplate {
    pub name: Name,
    pub kind: TypeKind,
    pub bases: Vec<Name>,
    /// Own attributes, in declaration order.
    pub attributes: Vec<Member>,
    pub methods: FxHashMap<Name, Arc<Callable>>,
    /// Method resolution order: the type itself, then each base's order in
    /// declaration order, without duplicates.
    pub mro: SmallVec<[Name; 4]>,
    /// The declaring node, for recognizing an identical redeclaration.
    pub declaration: Arc<Node>,
}

impl TypeTemplate {
    /// Build a template from a `Struct` or `Class` declaration node.
    ///
    /// The MRO is left empty; `TypeSegment::define` computes it.
    pub fn from_node(node: &Node) -> EvalResult<Self> {
        let (name, kind, bases) = match &node.kind {
            NodeKind::Struct(name) => (name.clone(), TypeKind::Struct, Vec::new()),
            NodeKind::Class { name, extends } => (name.clone(), TypeKind::Class, extends.clone()),
            _ => return Err(malformed("expected a type declaration")),
        };
        let mut attributes = Vec::new();
        let mut methods = FxHashMap::default();
        for member in &node.children {
            match &member.kind {
                NodeKind::Attribute { name: attr, access } => attributes.push(Member {
                    name: attr.clone(),
                    access: *access,
                    default: member.child(0).map(|d| Arc::new(d.clone())),
                    owner: name.clone(),
                }),
                NodeKind::Method { name: method, .. } => {
                    let callable = Callable::from_node(member, Some(name.clone()))?;
                    methods.insert(method.clone(), Arc::new(callable));
                }
                _ => return Err(malformed("type member is not an attribute or method")),
            }
        }
        Ok(TypeTemplate {
            name,
            kind,
            bases,
            attributes,
            methods,
            mro: SmallVec::new(),
            declaration: Arc::new(node.clone()),
        })
    }
}

/// Declared types by name.
#[derive(Debug, Default)]
pub struct TypeSegment {
    types: FxHashMap<Name, Arc<TypeTemplate>>,
}

impl TypeSegment {
    /// Register a template, computing its MRO.
    ///
    /// Every base must already be declared. Declaring an existing name again
    /// with an identical node returns the registered template; any other
    /// declaration of a taken name is rejected.
    pub fn define(&mut self, mut template: TypeTemplate) -> EvalResult<Arc<TypeTemplate>> {
        if let Some(existing) = self.types.get(&template.name) {
            if *existing.declaration == *template.declaration {
                return Ok(Arc::clone(existing));
            }
            return Err(type_redefined(template.name.as_str()));
        }
        let mut mro: SmallVec<[Name; 4]> = SmallVec::new();
        mro.push(template.name.clone());
        for base in &template.bases {
            let parent = self
                .types
                .get(base)
                .ok_or_else(|| unknown_type(base.as_str()))?;
            for ancestor in &parent.mro {
                if !mro.contains(ancestor) {
                    mro.push(ancestor.clone());
                }
            }
        }
        template.mro = mro;
        let template = Arc::new(template);
        self.types
            .insert(template.name.clone(), Arc::clone(&template));
        Ok(template)
    }

    pub fn get(&self, name: &str) -> Option<Arc<TypeTemplate>> {
        self.types.get(name).cloned()
    }

    /// First method named `method` along the MRO of `type_name`.
    pub fn find_method(&self, type_name: &str, method: &str) -> Option<Arc<Callable>> {
        let template = self.types.get(type_name)?;
        template.mro.iter().find_map(|t| {
            self.types
                .get(t)
                .and_then(|tpl| tpl.methods.get(method).cloned())
        })
    }

    /// First attribute declaration named `attribute` along the MRO.
    pub fn find_attribute(&self, type_name: &str, attribute: &str) -> Option<Member> {
        let template = self.types.get(type_name)?;
        template.mro.iter().find_map(|t| {
            self.types
                .get(t)
                .and_then(|tpl| tpl.attributes.iter().find(|m| m.name.as_str() == attribute).cloned())
        })
    }

    /// Attributes an instance of `type_name` starts with: bases first, in
    /// declaration order, then the type's own. A redeclared attribute keeps
    /// its first position and takes the most derived initializer.
    pub fn layout(&self, type_name: &str) -> Vec<Member> {
        let mut out: Vec<Member> = Vec::new();
        self.collect_layout(type_name, &mut out);
        out
    }

    // Bases are always declared before their subtypes, so this terminates.
    fn collect_layout(&self, type_name: &str, out: &mut Vec<Member>) {
        let Some(template) = self.types.get(type_name) else {
            return;
        };
        for base in &template.bases {
            self.collect_layout(base.as_str(), out);
        }
        for member in &template.attributes {
            match out.iter_mut().find(|m| m.name == member.name) {
                Some(existing) => *existing = member.clone(),
                None => out.push(member.clone()),
            }
        }
    }

    /// Whether `candidate` appears in the MRO of `type_name`.
    pub fn inherits(&self, type_name: &str, candidate: &str) -> bool {
        self.types
            .get(type_name)
            .is_some_and(|t| t.mro.iter().any(|n| n.as_str() == candidate))
    }

    /// Names of declared types.
    pub fn names(&self) -> impl Iterator<Item = &Name> {
        self.types.keys()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;

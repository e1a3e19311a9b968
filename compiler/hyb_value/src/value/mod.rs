//! Runtime values.
//!
//! A [`Value`] lives in a collector slot and is addressed by a [`ValueId`].
//! Containers hold the ids of their children, never the children
//! themselves, so reference counts are tracked per slot.

use std::fmt;

use bitflags::bitflags;
use hyb_ir::Name;

/// Handle to a value slot in the collector arena.
///
/// The generation detects use of an id whose slot has been freed and
/// reused.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ValueId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ValueId {
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueId({}v{})", self.index, self.generation)
    }
}

bitflags! {
    /// Pool entry attributes.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct Attributes: u8 {
        /// Part of the syntax tree's constant pool. Never collected before teardown.
        const CONSTANT = 1 << 0;
        /// Freshly allocated temporary, eligible for immediate release.
        const GARBAGE  = 1 << 1;
        /// Promoted to the lag list after surviving enough collections.
        const LAGGING  = 1 << 2;
    }
}

/// Target of an alias (address-of a function or a value slot).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AliasTarget {
    /// Index into the code segment.
    Function(usize),
    Value(ValueId),
}

/// Fields of a structure or class instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub type_name: Name,
    /// Attributes in declaration order, bases first.
    pub fields: Vec<(Name, ValueId)>,
}

impl Instance {
    pub fn new(type_name: Name) -> Self {
        Instance {
            type_name,
            fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<ValueId> {
        self.fields
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, id)| *id)
    }

    pub(crate) fn field_slot(&mut self, name: &str) -> Option<&mut ValueId> {
        self.fields
            .iter_mut()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, id)| id)
    }
}

/// An associative map: two index-aligned sequences.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapValue {
    pub keys: Vec<ValueId>,
    pub values: Vec<ValueId>,
}

impl MapValue {
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// A runtime value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
    Binary(Vec<u8>),
    Vector(Vec<ValueId>),
    Map(MapValue),
    Struct(Instance),
    Class(Instance),
    Alias(AliasTarget),
    Reference(ValueId),
    /// Opaque handle owned by native code (thread handles, module resources).
    Handle(u64),
}

/// Type tag of a value, for diagnostics, `typeof` and teardown ordering.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Bool,
    Int,
    Float,
    Char,
    Str,
    Binary,
    Vector,
    Map,
    Struct,
    Class,
    Alias,
    Reference,
    Handle,
}

impl TypeTag {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Int => "integer",
            Self::Float => "float",
            Self::Char => "char",
            Self::Str => "string",
            Self::Binary => "binary",
            Self::Vector => "array",
            Self::Map => "map",
            Self::Struct => "struct",
            Self::Class => "class",
            Self::Alias => "alias",
            Self::Reference => "reference",
            Self::Handle => "handle",
        }
    }

    /// Teardown rank. Higher ranks are released first, so indirections and
    /// composites go before the scalars they point to.
    pub const fn hierarchy_rank(self) -> u8 {
        match self {
            Self::Reference => 8,
            Self::Class => 7,
            Self::Struct => 6,
            Self::Map => 5,
            Self::Vector => 4,
            Self::Alias => 3,
            Self::Binary | Self::Str => 2,
            Self::Handle => 1,
            Self::Bool | Self::Int | Self::Float | Self::Char => 0,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub const fn tag(&self) -> TypeTag {
        match self {
            Value::Bool(_) => TypeTag::Bool,
            Value::Int(_) => TypeTag::Int,
            Value::Float(_) => TypeTag::Float,
            Value::Char(_) => TypeTag::Char,
            Value::Str(_) => TypeTag::Str,
            Value::Binary(_) => TypeTag::Binary,
            Value::Vector(_) => TypeTag::Vector,
            Value::Map(_) => TypeTag::Map,
            Value::Struct(_) => TypeTag::Struct,
            Value::Class(_) => TypeTag::Class,
            Value::Alias(_) => TypeTag::Alias,
            Value::Reference(_) => TypeTag::Reference,
            Value::Handle(_) => TypeTag::Handle,
        }
    }

    #[inline]
    pub const fn type_name(&self) -> &'static str {
        self.tag().name()
    }

    /// Whether this value is a scalar (absorbable by string concatenation,
    /// passable to a threaded call).
    pub const fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Char(_) | Value::Str(_)
        )
    }

    /// Ids this value holds a counted reference to.
    pub fn children(&self) -> Vec<ValueId> {
        match self {
            Value::Vector(items) => items.clone(),
            Value::Map(map) => map.keys.iter().chain(&map.values).copied().collect(),
            Value::Struct(inst) | Value::Class(inst) => {
                inst.fields.iter().map(|(_, id)| *id).collect()
            }
            Value::Reference(target) | Value::Alias(AliasTarget::Value(target)) => vec![*target],
            _ => Vec::new(),
        }
    }

    /// Approximate number of bytes this value accounts for in the pool.
    pub fn footprint(&self) -> usize {
        let payload = match self {
            Value::Str(s) => s.len(),
            Value::Binary(b) => b.len(),
            Value::Vector(items) => items.len() * std::mem::size_of::<ValueId>(),
            Value::Map(map) => 2 * map.len() * std::mem::size_of::<ValueId>(),
            Value::Struct(inst) | Value::Class(inst) => {
                inst.fields.len() * std::mem::size_of::<(Name, ValueId)>()
            }
            _ => 0,
        };
        std::mem::size_of::<Value>() + payload
    }

    /// Byte size of the raw payload, as seen by `pack`.
    pub fn raw_size(&self) -> usize {
        match self {
            Value::Int(_) | Value::Float(_) => 8,
            Value::Char(_) | Value::Bool(_) => 1,
            Value::Str(s) => s.len(),
            Value::Binary(b) => b.len(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests;

//! Attribute values and the hash-consed tables behind [`TypeRef`] and
//! [`PathRef`].

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use cranelift_entity::{EntityRef, PrimaryMap};
use smallvec::SmallVec;

use crate::refs::{PathRef, TypeRef};
use crate::symbol::Symbol;

/// Constant data attached to ops and types.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    Unit,
    Bool(bool),
    /// Signless; see [`Attribute::as_i64`] for the signed view.
    IntBits(u64),
    FloatBits(u64),
    Type(TypeRef),
    Symbol(Symbol),
    List(Vec<Attribute>),
    DenseElements(DenseElements),
}

/// A shaped literal: row-major element values under a tensor or memref type.
///
/// Bufferizing a constant keeps `data` and swaps `ty` for the memref with
/// the same element type and shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DenseElements {
    pub ty: TypeRef,
    pub data: Vec<Attribute>,
}

impl DenseElements {
    pub fn new(ty: TypeRef, data: Vec<Attribute>) -> Self {
        Self { ty, data }
    }

    pub fn with_type(&self, ty: TypeRef) -> Self {
        Self::new(ty, self.data.clone())
    }
}

impl Attribute {
    pub fn as_i64(&self) -> Option<i64> {
        let Attribute::IntBits(bits) = *self else {
            return None;
        };
        Some(bits as i64)
    }

    /// Offsets, shapes and bounds are stored as lists of integers.
    pub fn as_i64_list(&self) -> Option<Vec<i64>> {
        let Attribute::List(items) = self else {
            return None;
        };
        items.iter().map(Attribute::as_i64).collect()
    }

    pub fn i64_list(values: impl IntoIterator<Item = i64>) -> Self {
        Attribute::List(values.into_iter().map(Attribute::from).collect())
    }
}

impl From<i64> for Attribute {
    fn from(value: i64) -> Self {
        Attribute::IntBits(value as u64)
    }
}

impl From<u64> for Attribute {
    fn from(value: u64) -> Self {
        Attribute::IntBits(value)
    }
}

impl From<bool> for Attribute {
    fn from(value: bool) -> Self {
        Attribute::Bool(value)
    }
}

impl From<DenseElements> for Attribute {
    fn from(value: DenseElements) -> Self {
        Attribute::DenseElements(value)
    }
}

/// A type: `dialect.name`, its type parameters and keyed attributes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeData {
    pub dialect: Symbol,
    pub name: Symbol,
    pub params: SmallVec<[TypeRef; 4]>,
    pub attrs: BTreeMap<Symbol, Attribute>,
}

pub struct TypeDataBuilder(TypeData);

impl TypeDataBuilder {
    pub fn new(dialect: Symbol, name: Symbol) -> Self {
        Self(TypeData {
            dialect,
            name,
            params: SmallVec::new(),
            attrs: BTreeMap::new(),
        })
    }

    pub fn param(self, ty: TypeRef) -> Self {
        self.params([ty])
    }

    pub fn params(mut self, tys: impl IntoIterator<Item = TypeRef>) -> Self {
        self.0.params.extend(tys);
        self
    }

    pub fn attr(mut self, key: impl Into<Symbol>, val: Attribute) -> Self {
        self.0.attrs.insert(key.into(), val);
        self
    }

    pub fn build(self) -> TypeData {
        self.0
    }
}

/// Arena where equal values share one handle.
pub struct Interner<K: EntityRef, V> {
    items: PrimaryMap<K, V>,
    lookup: HashMap<V, K>,
}

pub type TypeInterner = Interner<TypeRef, TypeData>;
pub type PathInterner = Interner<PathRef, String>;

impl<K: EntityRef, V: Clone + Eq + Hash> Interner<K, V> {
    pub fn new() -> Self {
        Self {
            items: PrimaryMap::new(),
            lookup: HashMap::new(),
        }
    }

    pub fn intern(&mut self, value: V) -> K {
        if let Some(&key) = self.lookup.get(&value) {
            return key;
        }
        let key = self.items.push(value.clone());
        self.lookup.insert(value, key);
        key
    }

    pub fn get(&self, key: K) -> &V {
        &self.items[key]
    }
}

impl<K: EntityRef, V: Clone + Eq + Hash> Default for Interner<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

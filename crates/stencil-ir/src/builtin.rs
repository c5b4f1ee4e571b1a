//! Builtin types and their classification.
//!
//! Types are interned as plain [`TypeData`]; this module gives the handful
//! that the stencil passes care about a typed shape:
//!
//! ```text
//! core.f32 / core.i64 / core.index ...    scalars
//! core.tensor(elem) {shape = [...]}       value-semantics array
//! core.memref(elem) {shape = [...]}       reference-semantics buffer
//! stencil.field(elem) {bounds = [...]}    stencil field over elem
//! func.fn(inputs..., outputs...) {num_inputs = n}
//! ```
//!
//! [`classify`] turns a `TypeRef` into an exhaustive [`TypeKind`] so callers
//! can `match` instead of comparing dialect/name pairs.

use smallvec::SmallVec;

use crate::refs::TypeRef;
use crate::symbol::Symbol;
use crate::types::{Attribute, TypeData, TypeDataBuilder, TypeInterner};

/// Marker for a dynamic extent or offset in shapes and static slice lists.
pub const DYNAMIC_INDEX: i64 = i64::MIN;

crate::symbols! {
    CORE => "core",
    STENCIL => "stencil",
    FUNC => "func",
    TENSOR => "tensor",
    MEMREF => "memref",
    FIELD => "field",
    FN => "fn",
    ATTR_SHAPE => "shape",
    ATTR_BOUNDS => "bounds",
    ATTR_NUM_INPUTS => "num_inputs",
}

/// Element type plus shape, shared by tensors and memrefs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapedType {
    pub element: TypeRef,
    pub shape: SmallVec<[i64; 4]>,
}

impl ShapedType {
    /// True when no extent is [`DYNAMIC_INDEX`].
    pub fn has_static_shape(&self) -> bool {
        self.shape.iter().all(|&d| d != DYNAMIC_INDEX)
    }
}

/// `stencil.field` container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldType {
    pub element: TypeRef,
    pub bounds: Vec<(i64, i64)>,
}

/// `func.fn` signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionType {
    pub inputs: Vec<TypeRef>,
    pub outputs: Vec<TypeRef>,
}

/// Closed set of type shapes the stencil passes distinguish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Tensor(ShapedType),
    MemRef(ShapedType),
    Field(FieldType),
    Function(FunctionType),
    /// A `core.*` scalar such as `core.f32` or `core.index`.
    Scalar(Symbol),
    Other,
}

/// Classify an interned type.
pub fn classify(types: &TypeInterner, ty: TypeRef) -> TypeKind {
    let data = types.get(ty);
    if data.dialect == CORE() {
        if data.name == TENSOR() {
            return shaped(data).map_or(TypeKind::Other, TypeKind::Tensor);
        }
        if data.name == MEMREF() {
            return shaped(data).map_or(TypeKind::Other, TypeKind::MemRef);
        }
        if data.params.is_empty() {
            return TypeKind::Scalar(data.name);
        }
    } else if data.dialect == STENCIL() && data.name == FIELD() {
        if let Some(&element) = data.params.first() {
            let bounds = data
                .attrs
                .get(&ATTR_BOUNDS())
                .map(bounds_from_attr)
                .unwrap_or_default();
            return TypeKind::Field(FieldType { element, bounds });
        }
    } else if data.dialect == FUNC() && data.name == FN() {
        let num_inputs = data
            .attrs
            .get(&ATTR_NUM_INPUTS())
            .and_then(Attribute::as_i64)
            .map_or(data.params.len(), |n| n as usize)
            .min(data.params.len());
        return TypeKind::Function(FunctionType {
            inputs: data.params[..num_inputs].to_vec(),
            outputs: data.params[num_inputs..].to_vec(),
        });
    }
    TypeKind::Other
}

fn shaped(data: &TypeData) -> Option<ShapedType> {
    let element = *data.params.first()?;
    let shape = data.attrs.get(&ATTR_SHAPE())?.as_i64_list()?;
    Some(ShapedType {
        element,
        shape: shape.into_iter().collect(),
    })
}

fn bounds_from_attr(attr: &Attribute) -> Vec<(i64, i64)> {
    let Attribute::List(items) = attr else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item.as_i64_list()?.as_slice() {
            [lb, ub] => Some((*lb, *ub)),
            _ => None,
        })
        .collect()
}

/// Shaped view of `ty` if it is a tensor.
pub fn as_tensor(types: &TypeInterner, ty: TypeRef) -> Option<ShapedType> {
    match classify(types, ty) {
        TypeKind::Tensor(shaped) => Some(shaped),
        _ => None,
    }
}

/// Shaped view of `ty` if it is a memref.
pub fn as_memref(types: &TypeInterner, ty: TypeRef) -> Option<ShapedType> {
    match classify(types, ty) {
        TypeKind::MemRef(shaped) => Some(shaped),
        _ => None,
    }
}

pub fn is_tensor(types: &TypeInterner, ty: TypeRef) -> bool {
    matches!(classify(types, ty), TypeKind::Tensor(_))
}

pub fn is_memref(types: &TypeInterner, ty: TypeRef) -> bool {
    matches!(classify(types, ty), TypeKind::MemRef(_))
}

// ============================================================================
// Constructors
// ============================================================================

/// Intern a `core.<name>` scalar type.
pub fn scalar(types: &mut TypeInterner, name: &'static str) -> TypeRef {
    types.intern(TypeDataBuilder::new(CORE(), Symbol::new(name)).build())
}

pub fn f32(types: &mut TypeInterner) -> TypeRef {
    scalar(types, "f32")
}

pub fn i32(types: &mut TypeInterner) -> TypeRef {
    scalar(types, "i32")
}

pub fn i64(types: &mut TypeInterner) -> TypeRef {
    scalar(types, "i64")
}

pub fn index(types: &mut TypeInterner) -> TypeRef {
    scalar(types, "index")
}

fn shaped_type(types: &mut TypeInterner, name: Symbol, element: TypeRef, shape: &[i64]) -> TypeRef {
    types.intern(
        TypeDataBuilder::new(CORE(), name)
            .param(element)
            .attr(ATTR_SHAPE(), Attribute::i64_list(shape.iter().copied()))
            .build(),
    )
}

/// Intern `core.tensor(element) {shape}`.
pub fn tensor(types: &mut TypeInterner, element: TypeRef, shape: &[i64]) -> TypeRef {
    shaped_type(types, TENSOR(), element, shape)
}

/// Intern `core.memref(element) {shape}`.
pub fn memref(types: &mut TypeInterner, element: TypeRef, shape: &[i64]) -> TypeRef {
    shaped_type(types, MEMREF(), element, shape)
}

/// Intern `stencil.field(element) {bounds}`.
pub fn field(types: &mut TypeInterner, element: TypeRef, bounds: &[(i64, i64)]) -> TypeRef {
    let bounds = bounds
        .iter()
        .map(|&(lb, ub)| Attribute::i64_list([lb, ub]))
        .collect::<Vec<_>>();
    types.intern(
        TypeDataBuilder::new(STENCIL(), FIELD())
            .param(element)
            .attr(ATTR_BOUNDS(), Attribute::List(bounds))
            .build(),
    )
}

/// Intern a `func.fn` signature.
pub fn function(types: &mut TypeInterner, inputs: &[TypeRef], outputs: &[TypeRef]) -> TypeRef {
    types.intern(
        TypeDataBuilder::new(FUNC(), FN())
            .params(inputs.iter().copied())
            .params(outputs.iter().copied())
            .attr(ATTR_NUM_INPUTS(), Attribute::from(inputs.len() as u64))
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_shaped_types() {
        let mut types = TypeInterner::new();
        let f32_ty = f32(&mut types);
        let t = tensor(&mut types, f32_ty, &[4, 255]);
        let m = memref(&mut types, f32_ty, &[4, 255]);
        assert_ne!(t, m);

        let expected = ShapedType {
            element: f32_ty,
            shape: smallvec::smallvec![4, 255],
        };
        assert_eq!(classify(&types, t), TypeKind::Tensor(expected.clone()));
        assert_eq!(classify(&types, m), TypeKind::MemRef(expected));
        assert_eq!(classify(&types, f32_ty), TypeKind::Scalar(Symbol::new("f32")));
    }

    #[test]
    fn classify_field_and_function() {
        let mut types = TypeInterner::new();
        let f32_ty = f32(&mut types);
        let i32_ty = i32(&mut types);
        let t = tensor(&mut types, f32_ty, &[510]);
        let fld = field(&mut types, t, &[(-1, 1023), (-1, 511)]);

        match classify(&types, fld) {
            TypeKind::Field(FieldType { element, bounds }) => {
                assert_eq!(element, t);
                assert_eq!(bounds, vec![(-1, 1023), (-1, 511)]);
            }
            other => panic!("expected field, got {other:?}"),
        }

        let sig = function(&mut types, &[fld, i32_ty], &[i32_ty]);
        assert_eq!(
            classify(&types, sig),
            TypeKind::Function(FunctionType {
                inputs: vec![fld, i32_ty],
                outputs: vec![i32_ty],
            })
        );
    }

    #[test]
    fn dynamic_extent_is_not_static() {
        let mut types = TypeInterner::new();
        let f32_ty = f32(&mut types);
        let t = tensor(&mut types, f32_ty, &[DYNAMIC_INDEX, 4]);
        let shaped = as_tensor(&types, t).unwrap();
        assert!(!shaped.has_static_shape());
        assert!(as_memref(&types, t).is_none());
    }
}

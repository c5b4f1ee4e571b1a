//! Type mapping between tensor and memref form.

use stencil_ir::builtin::{self, TypeKind};
use stencil_ir::rewrite::TypeConverter;
use stencil_ir::{TypeInterner, TypeRef};

use super::FieldConversion;

/// `tensor<S x T>` to `memref<S x T>`; `None` for every other type.
pub fn tensor_to_memref_type(types: &mut TypeInterner, ty: TypeRef) -> Option<TypeRef> {
    let shaped = builtin::as_tensor(types, ty)?;
    Some(builtin::memref(types, shaped.element, &shaped.shape))
}

/// `memref<S x T>` to `tensor<S x T>`; `None` for every other type.
pub fn memref_to_tensor_type(types: &mut TypeInterner, ty: TypeRef) -> Option<TypeRef> {
    let shaped = builtin::as_memref(types, ty)?;
    Some(builtin::tensor(types, shaped.element, &shaped.shape))
}

/// Bufferize a `stencil.field` whose element is a tensor.
///
/// Fields over anything else, and non-field types, are left alone.
pub fn convert_field_type(
    types: &mut TypeInterner,
    ty: TypeRef,
    mode: FieldConversion,
) -> Option<TypeRef> {
    let TypeKind::Field(field) = builtin::classify(types, ty) else {
        return None;
    };
    let buffer = tensor_to_memref_type(types, field.element)?;
    Some(match mode {
        FieldConversion::ElementOnly => builtin::field(types, buffer, &field.bounds),
        FieldConversion::Unwrap => buffer,
    })
}

/// Apply [`convert_field_type`] to every input and output of a `func.fn`.
///
/// Returns `None` if the signature is unchanged.
pub fn convert_signature(
    types: &mut TypeInterner,
    sig: TypeRef,
    mode: FieldConversion,
) -> Option<TypeRef> {
    let TypeKind::Function(func_ty) = builtin::classify(types, sig) else {
        return None;
    };

    let mut changed = false;
    let mut convert_all = |types: &mut TypeInterner, tys: &[TypeRef]| -> Vec<TypeRef> {
        tys.iter()
            .map(|&ty| match convert_field_type(types, ty, mode) {
                Some(new_ty) => {
                    changed = true;
                    new_ty
                }
                None => ty,
            })
            .collect()
    };
    let inputs = convert_all(types, &func_ty.inputs);
    let outputs = convert_all(types, &func_ty.outputs);

    changed.then(|| builtin::function(types, &inputs, &outputs))
}

/// Converter the bufferization patterns map tensor types through.
pub fn type_converter() -> TypeConverter {
    let mut tc = TypeConverter::new();
    tc.add_conversion(tensor_to_memref_type);
    tc
}

//! Conversion ops bridging a value between tensor and memref form.
//!
//! Both functions create the op detached; the caller decides where it goes.

use stencil_ir::dialect::bufferization::{self, ToMemref, ToTensor};
use stencil_ir::{IrContext, Location, ValueRef};

use super::types::{memref_to_tensor_type, tensor_to_memref_type};

/// `bufferization.to_memref` of a tensor value.
///
/// # Panics
///
/// Panics if `tensor` is not tensor-typed.
pub fn materialize_to_buffer(ctx: &mut IrContext, location: Location, tensor: ValueRef) -> ToMemref {
    let ty = ctx.value_ty(tensor);
    let Some(buffer_ty) = tensor_to_memref_type(&mut ctx.types, ty) else {
        panic!("materialize_to_buffer: {tensor} is not a tensor");
    };
    tracing::trace!(value = %tensor, "materializing tensor as memref");
    bufferization::to_memref(ctx, location, tensor, buffer_ty)
}

/// `bufferization.to_tensor` view of a memref value, always `restrict`.
///
/// # Panics
///
/// Panics if `buffer` is not memref-typed.
pub fn view_as_tensor(
    ctx: &mut IrContext,
    location: Location,
    buffer: ValueRef,
    writable: bool,
) -> ToTensor {
    let ty = ctx.value_ty(buffer);
    let Some(tensor_ty) = memref_to_tensor_type(&mut ctx.types, ty) else {
        panic!("view_as_tensor: {buffer} is not a memref");
    };
    tracing::trace!(value = %buffer, writable, "viewing memref as tensor");
    bufferization::to_tensor(ctx, location, buffer, tensor_ty, true, writable)
}

//! `bufferization` dialect: conversions between tensors and memrefs.

use crate::context::{IrContext, OpBuilder};
use crate::location::Location;
use crate::refs::{TypeRef, ValueRef};
use crate::types::Attribute;

crate::define_op! {
    /// `bufferization.to_memref`: buffer holding the contents of a tensor.
    pub struct ToMemref = "bufferization"."to_memref", operands: 1;
}

impl ToMemref {
    pub fn tensor(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }

    pub fn result_ty(&self, ctx: &IrContext) -> TypeRef {
        ctx.op_result_ty(self.0, 0)
    }
}

pub fn to_memref(
    ctx: &mut IrContext,
    location: Location,
    tensor: ValueRef,
    result_ty: TypeRef,
) -> ToMemref {
    let op = OpBuilder::new(location, "bufferization", "to_memref")
        .operand(tensor)
        .result(result_ty)
        .create(ctx);
    ToMemref(op)
}

crate::define_op! {
    /// `bufferization.to_tensor`: tensor view over a memref.
    ///
    /// `restrict` promises the memref is not accessed through another alias
    /// while the view is live; `writable` allows in-place updates through it.
    pub struct ToTensor = "bufferization"."to_tensor", attrs: ["restrict", "writable"], operands: 1;
}

impl ToTensor {
    pub fn memref(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn restrict(&self, ctx: &IrContext) -> bool {
        super::bool_attr(ctx, self.0, "restrict")
    }

    pub fn writable(&self, ctx: &IrContext) -> bool {
        super::bool_attr(ctx, self.0, "writable")
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }

    pub fn result_ty(&self, ctx: &IrContext) -> TypeRef {
        ctx.op_result_ty(self.0, 0)
    }
}

pub fn to_tensor(
    ctx: &mut IrContext,
    location: Location,
    memref: ValueRef,
    result_ty: TypeRef,
    restrict: bool,
    writable: bool,
) -> ToTensor {
    let op = OpBuilder::new(location, "bufferization", "to_tensor")
        .operand(memref)
        .result(result_ty)
        .attr("restrict", Attribute::Bool(restrict))
        .attr("writable", Attribute::Bool(writable))
        .create(ctx);
    ToTensor(op)
}

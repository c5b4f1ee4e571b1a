//! `arith` dialect. Only constants are needed here.

use crate::context::{IrContext, OpBuilder};
use crate::location::Location;
use crate::refs::{TypeRef, ValueRef};
use crate::types::{Attribute, DenseElements};

crate::define_op! {
    /// `arith.const`: materializes the `value` attribute as an SSA value.
    pub struct Const = "arith"."const", attrs: ["value"];
}

impl Const {
    pub fn value<'a>(&self, ctx: &'a IrContext) -> &'a Attribute {
        super::required_attr(ctx, self.0, "value")
    }

    /// The literal payload if this is a shaped constant.
    pub fn dense_value<'a>(&self, ctx: &'a IrContext) -> Option<&'a DenseElements> {
        match self.value(ctx) {
            Attribute::DenseElements(dense) => Some(dense),
            _ => None,
        }
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }

    pub fn result_ty(&self, ctx: &IrContext) -> TypeRef {
        ctx.op_result_ty(self.0, 0)
    }
}

pub fn r#const(
    ctx: &mut IrContext,
    location: Location,
    result_ty: TypeRef,
    value: impl Into<Attribute>,
) -> Const {
    let op = OpBuilder::new(location, "arith", "const")
        .result(result_ty)
        .attr("value", value.into())
        .create(ctx);
    Const(op)
}

//! `tensor` dialect: slicing.

use crate::builtin::DYNAMIC_INDEX;
use crate::context::{IrContext, OpBuilder};
use crate::location::Location;
use crate::refs::{TypeRef, ValueRef};
use crate::types::Attribute;

crate::define_op! {
    /// `tensor.extract_slice`
    ///
    /// Operands are the source followed by one value per [`DYNAMIC_INDEX`]
    /// entry of `static_offsets`, then `static_sizes`, then `static_strides`.
    pub struct ExtractSlice = "tensor"."extract_slice",
        attrs: ["static_offsets", "static_sizes", "static_strides"],
        operands: 1;
}

impl ExtractSlice {
    pub fn source(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn static_offsets(&self, ctx: &IrContext) -> Vec<i64> {
        super::i64_list_attr(ctx, self.0, "static_offsets")
    }

    pub fn static_sizes(&self, ctx: &IrContext) -> Vec<i64> {
        super::i64_list_attr(ctx, self.0, "static_sizes")
    }

    pub fn static_strides(&self, ctx: &IrContext) -> Vec<i64> {
        super::i64_list_attr(ctx, self.0, "static_strides")
    }

    /// SSA values standing in for the dynamic entries of `static_offsets`.
    pub fn offsets<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        let n = dynamic_count(&self.static_offsets(ctx));
        &ctx.op_operands(self.0)[1..1 + n]
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }

    pub fn result_ty(&self, ctx: &IrContext) -> TypeRef {
        ctx.op_result_ty(self.0, 0)
    }
}

fn dynamic_count(values: &[i64]) -> usize {
    values.iter().filter(|&&v| v == DYNAMIC_INDEX).count()
}

#[allow(clippy::too_many_arguments)]
pub fn extract_slice(
    ctx: &mut IrContext,
    location: Location,
    source: ValueRef,
    dynamic: impl IntoIterator<Item = ValueRef>,
    result_ty: TypeRef,
    static_offsets: &[i64],
    static_sizes: &[i64],
    static_strides: &[i64],
) -> ExtractSlice {
    let op = OpBuilder::new(location, "tensor", "extract_slice")
        .operand(source)
        .operands(dynamic)
        .result(result_ty)
        .attr("static_offsets", Attribute::i64_list(static_offsets.iter().copied()))
        .attr("static_sizes", Attribute::i64_list(static_sizes.iter().copied()))
        .attr("static_strides", Attribute::i64_list(static_strides.iter().copied()))
        .create(ctx);
    let expected = 1
        + dynamic_count(static_offsets)
        + dynamic_count(static_sizes)
        + dynamic_count(static_strides);
    debug_assert_eq!(
        ctx.op_operands(op).len(),
        expected,
        "extract_slice: dynamic operand count does not match DYNAMIC_INDEX entries"
    );
    ExtractSlice(op)
}

//! `csl_stencil` dialect: neighbor-exchange stencil computations.
//!
//! ```text
//! %r = csl_stencil.apply(%communicated, %iter_arg, %args..., %dest) {
//!   chunk_reduce: ^bb(%recv, %offset, %acc, %args...) { ... csl_stencil.yield %acc }
//!   post_process: ^bb(%in, %acc, %args...)            { ... csl_stencil.yield ... }
//! }
//! ```

use crate::context::{IrContext, OpBuilder};
use crate::location::Location;
use crate::refs::{RegionRef, TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::Attribute;

/// Block argument positions of the `chunk_reduce` region.
pub mod chunk_reduce_arg {
    /// Received neighbor data, already in the form it is consumed in.
    pub const RECEIVED: usize = 0;
    /// Dynamic offset of the current chunk.
    pub const OFFSET: usize = 1;
    /// The accumulator.
    pub const ACCUMULATOR: usize = 2;
}

/// Block argument positions of the `post_process` region.
pub mod post_process_arg {
    /// The accumulator after all chunks were reduced.
    pub const ACCUMULATOR: usize = 1;
}

crate::define_op! {
    /// `csl_stencil.apply`
    ///
    /// Operands: `[communicated_stencil, iter_arg, args..., dest]`.
    /// Regions: `[chunk_reduce, post_process]`.
    pub struct Apply = "csl_stencil"."apply", regions: 2, operands: 3;
}

impl Apply {
    pub fn communicated_stencil(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    /// The accumulator threaded through `chunk_reduce`.
    pub fn iter_arg(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[1]
    }

    pub fn args<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        let operands = ctx.op_operands(self.0);
        &operands[2..operands.len() - 1]
    }

    pub fn dest(&self, ctx: &IrContext) -> ValueRef {
        let operands = ctx.op_operands(self.0);
        operands[operands.len() - 1]
    }

    pub fn chunk_reduce(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }

    pub fn post_process(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[1]
    }

    pub fn results<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_results(self.0)
    }
}

/// Build a `csl_stencil.apply`. Attributes are copied verbatim.
#[allow(clippy::too_many_arguments)]
pub fn apply(
    ctx: &mut IrContext,
    location: Location,
    communicated_stencil: ValueRef,
    iter_arg: ValueRef,
    args: impl IntoIterator<Item = ValueRef>,
    dest: ValueRef,
    result_types: impl IntoIterator<Item = TypeRef>,
    attrs: impl IntoIterator<Item = (Symbol, Attribute)>,
    chunk_reduce: RegionRef,
    post_process: RegionRef,
) -> Apply {
    let op = OpBuilder::new(location, "csl_stencil", "apply")
        .operand(communicated_stencil)
        .operand(iter_arg)
        .operands(args)
        .operand(dest)
        .results(result_types)
        .attrs(attrs)
        .region(chunk_reduce)
        .region(post_process)
        .create(ctx);
    Apply(op)
}

crate::define_op! {
    /// `csl_stencil.access`: read a neighbor's value at a relative offset.
    pub struct Access = "csl_stencil"."access", attrs: ["offset"], operands: 1;
}

impl Access {
    pub fn op(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn offset(&self, ctx: &IrContext) -> Vec<i64> {
        super::i64_list_attr(ctx, self.0, "offset")
    }

    pub fn offset_mapping(&self, ctx: &IrContext) -> Option<Vec<i64>> {
        ctx.op(self.0)
            .attributes
            .get(&Symbol::new("offset_mapping"))
            .and_then(Attribute::as_i64_list)
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }

    pub fn result_ty(&self, ctx: &IrContext) -> TypeRef {
        ctx.op_result_ty(self.0, 0)
    }
}

pub fn access(
    ctx: &mut IrContext,
    location: Location,
    op: ValueRef,
    result_ty: TypeRef,
    offset: &[i64],
    offset_mapping: Option<&[i64]>,
) -> Access {
    let mut builder =
        OpBuilder::new(location, "csl_stencil", "access")
            .operand(op)
            .result(result_ty)
            .attr("offset", Attribute::i64_list(offset.iter().copied()));
    if let Some(mapping) = offset_mapping {
        builder = builder.attr(
            "offset_mapping",
            Attribute::i64_list(mapping.iter().copied()),
        );
    }
    Access(builder.create(ctx))
}

crate::define_op! {
    /// `csl_stencil.yield`: region terminator.
    pub struct Yield = "csl_stencil"."yield";
}

impl Yield {
    pub fn values<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.0)
    }
}

pub fn r#yield(
    ctx: &mut IrContext,
    location: Location,
    values: impl IntoIterator<Item = ValueRef>,
) -> Yield {
    let op = OpBuilder::new(location, "csl_stencil", "yield")
        .operands(values)
        .create(ctx);
    Yield(op)
}

//! Dialect definitions.
//!
//! Each module wraps the operations of one dialect: a [`define_op!`]
//! wrapper, typed accessors and a constructor that creates the operation
//! detached from any block.
//!
//! [`define_op!`]: crate::define_op

pub mod arith;
pub mod bufferization;
pub mod core;
pub mod csl_stencil;
pub mod func;
pub mod tensor;

use crate::context::IrContext;
use crate::refs::OpRef;
use crate::types::Attribute;

/// Read a required attribute of `op`.
///
/// # Panics
///
/// Panics if the attribute is missing. Wrappers obtained through
/// `from_op` have already been checked for their required attributes.
pub(crate) fn required_attr<'a>(ctx: &'a IrContext, op: OpRef, name: &'static str) -> &'a Attribute {
    match ctx.op(op).attributes.get(&crate::Symbol::new(name)) {
        Some(attr) => attr,
        None => panic!("{}: missing attribute `{name}`", ctx.op(op).name),
    }
}

pub(crate) fn bool_attr(ctx: &IrContext, op: OpRef, name: &'static str) -> bool {
    match required_attr(ctx, op, name) {
        Attribute::Bool(b) => *b,
        other => panic!("expected Bool attribute for `{name}`, found {other:?}"),
    }
}

pub(crate) fn i64_list_attr(ctx: &IrContext, op: OpRef, name: &'static str) -> Vec<i64> {
    let attr = required_attr(ctx, op, name);
    match attr.as_i64_list() {
        Some(values) => values,
        None => panic!("expected integer list attribute for `{name}`, found {attr:?}"),
    }
}

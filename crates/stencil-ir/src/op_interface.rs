//! Operation property queries.
//!
//! Purity is declared per wrapper type through the [`Pure`] marker and
//! listed once in [`PURE_OPS`]; there is no load-time registry.

use crate::context::IrContext;
use crate::dialect::{arith, bufferization, csl_stencil, tensor};
use crate::ops::DialectOp;
use crate::refs::OpRef;

/// Marker trait for pure operations (no side effects, safe to remove if unused).
pub trait Pure: DialectOp {}

impl Pure for arith::Const {}
impl Pure for bufferization::ToMemref {}
impl Pure for bufferization::ToTensor {}
impl Pure for csl_stencil::Access {}
impl Pure for tensor::ExtractSlice {}

/// `(dialect, op)` pairs of every [`Pure`] operation.
pub const PURE_OPS: &[(&str, &str)] = &[
    pure_entry::<arith::Const>(),
    pure_entry::<bufferization::ToMemref>(),
    pure_entry::<bufferization::ToTensor>(),
    pure_entry::<csl_stencil::Access>(),
    pure_entry::<tensor::ExtractSlice>(),
];

const fn pure_entry<T: Pure>() -> (&'static str, &'static str) {
    (T::DIALECT_NAME, T::OP_NAME)
}

/// Interface for querying operation purity.
pub struct PureOps;

impl PureOps {
    /// Check if an operation is pure (no side effects, safe to remove if unused).
    ///
    /// Unlisted operations are treated as impure.
    pub fn is_pure(ctx: &IrContext, op: OpRef) -> bool {
        let data = ctx.op(op);
        PURE_OPS
            .iter()
            .any(|(dialect, name)| data.dialect == *dialect && data.name == *name)
    }

    /// Pure and every result unused.
    pub fn is_removable(ctx: &IrContext, op: OpRef) -> bool {
        Self::is_pure(ctx, op) && ctx.op_results(op).iter().all(|&v| !ctx.has_uses(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;
    use crate::dialect::func;
    use crate::location::{Location, Span};
    use crate::refs::PathRef;

    #[test]
    fn conversions_are_pure_terminators_are_not() {
        let mut ctx = IrContext::new();
        let loc = Location::new(PathRef::from_u32(0), Span::default());
        let f32_ty = builtin::f32(&mut ctx.types);
        let t = builtin::tensor(&mut ctx.types, f32_ty, &[4]);
        let m = builtin::memref(&mut ctx.types, f32_ty, &[4]);

        let dense = crate::types::DenseElements::new(t, vec![]);
        let c = arith::r#const(&mut ctx, loc, t, dense);
        let value = c.result(&ctx);
        let buf = bufferization::to_memref(&mut ctx, loc, value, m);
        let buffer = buf.result(&ctx);
        let ret = func::r#return(&mut ctx, loc, [buffer]);

        assert!(PureOps::is_pure(&ctx, c.op_ref()));
        assert!(PureOps::is_pure(&ctx, buf.op_ref()));
        assert!(!PureOps::is_pure(&ctx, ret.op_ref()));

        assert!(!PureOps::is_removable(&ctx, c.op_ref()));
        assert!(!PureOps::is_removable(&ctx, buf.op_ref()));
    }
}

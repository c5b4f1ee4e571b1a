//! Pattern rewrite infrastructure.
//!
//! Patterns inspect one operation at a time and record their edits in a
//! [`PatternRewriter`]; the [`PatternApplicator`] applies those edits with
//! RAUW directly on the [`IrContext`] and iterates to a fixpoint.

pub mod applicator;
pub mod conversion_target;
pub mod helpers;
pub mod pattern;
pub mod rewriter;
pub mod type_converter;

pub use applicator::{ApplyResult, PatternApplicator};
pub use conversion_target::{ConversionTarget, IllegalOp, LegalityCheck};
pub use pattern::RewritePattern;
pub use rewriter::PatternRewriter;
pub use type_converter::TypeConverter;

use crate::context::IrContext;
use crate::dialect::core;
use crate::ops::DialectOp;
use crate::refs::{OpRef, RegionRef};
use crate::symbol::Symbol;

/// Thin wrapper around an `OpRef` pointing to a `core.module` operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Module(pub OpRef);

impl Module {
    /// Wrap `op`, verifying it is a `core.module`.
    pub fn new(ctx: &IrContext, op: OpRef) -> Option<Self> {
        core::Module::from_op(ctx, op).ok().map(|m| Module(m.op_ref()))
    }

    /// Get the module's body region.
    pub fn body(self, ctx: &IrContext) -> Option<RegionRef> {
        ctx.op(self.0).regions.first().copied()
    }

    /// Get the module name (from `sym_name` attribute).
    pub fn name(self, ctx: &IrContext) -> Option<Symbol> {
        core::Module::from_op(ctx, self.0).ok()?.sym_name(ctx)
    }
}

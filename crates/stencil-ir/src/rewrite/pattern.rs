//! Rewrite pattern trait.

use super::rewriter::PatternRewriter;
use crate::context::IrContext;
use crate::refs::OpRef;

/// A pattern that can match and transform one operation.
///
/// Return `true` if the pattern matched and recorded mutations via the
/// rewriter, `false` if it does not apply. A pattern must not match its own
/// output, otherwise the applicator never reaches a fixpoint.
pub trait RewritePattern {
    /// Attempt to match and rewrite an operation.
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter,
    ) -> bool;

    /// Human-readable name for logging.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

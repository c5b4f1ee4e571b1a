//! Pre-order traversal of nested IR.
//!
//! Ops are visited in program order, each op before the contents of its
//! regions. The walk keeps an explicit stack, so deep stencil nests do not
//! grow the call stack.

use std::ops::ControlFlow;

use crate::context::IrContext;
use crate::ops::DialectOp;
use crate::refs::{OpRef, RegionRef};

/// What the walk does after the callback returned for an op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Descend into the op's regions.
    Advance,
    /// Move on to the next sibling.
    Skip,
}

/// Visit every op nested in `region`. `Break` ends the walk early.
pub fn walk_region<B>(
    ctx: &IrContext,
    region: RegionRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B> {
    let mut pending = Vec::new();
    schedule(ctx, region, &mut pending);
    while let Some(op) = pending.pop() {
        if f(op)? == WalkAction::Advance {
            for &nested in ctx.op(op).regions.iter().rev() {
                schedule(ctx, nested, &mut pending);
            }
        }
    }
    ControlFlow::Continue(())
}

/// Push the ops of `region` so that its first op is popped first.
fn schedule(ctx: &IrContext, region: RegionRef, pending: &mut Vec<OpRef>) {
    for &block in ctx.region(region).blocks.iter().rev() {
        pending.extend(ctx.block(block).ops.iter().rev());
    }
}

/// Every `T` nested in `region`, in pre-order.
pub fn collect_typed<T: DialectOp>(ctx: &IrContext, region: RegionRef) -> Vec<T> {
    let mut found = Vec::new();
    let _ = walk_region::<()>(ctx, region, &mut |op| {
        found.extend(T::from_op(ctx, op).ok());
        ControlFlow::Continue(WalkAction::Advance)
    });
    found
}

//! Compound edits used when a pattern rebuilds an op.

use smallvec::SmallVec;

use crate::context::IrContext;
use crate::op_interface::PureOps;
use crate::refs::{BlockRef, OpRef, ValueRef};

/// Move every operation of `src` to the end of `dest`, substituting the
/// block arguments of `src` with `arg_values`.
///
/// `src` keeps its arguments but ends up empty and without uses.
///
/// # Panics
///
/// Panics if `arg_values` does not provide one value per argument of `src`.
pub fn inline_block(ctx: &mut IrContext, src: BlockRef, dest: BlockRef, arg_values: &[ValueRef]) {
    let src_args: SmallVec<[ValueRef; 8]> = ctx.block_args(src).into();
    assert_eq!(
        src_args.len(),
        arg_values.len(),
        "inline_block: {} has {} argument(s) but {} substitution(s) were given",
        src,
        src_args.len(),
        arg_values.len()
    );
    for (&old, &new) in src_args.iter().zip(arg_values) {
        ctx.replace_all_uses(old, new);
    }

    ctx.splice_ops(src, dest);
}

/// Erase an operation together with everything nested in its regions.
///
/// Nested blocks are emptied back to front so that uses inside a block are
/// released before their definitions.
pub fn erase_op_recursive(ctx: &mut IrContext, op: OpRef) {
    let regions = ctx.op(op).regions.clone();
    for region in regions {
        let blocks = ctx.region(region).blocks.clone();
        for block in blocks {
            let ops: SmallVec<[OpRef; 8]> = ctx.block(block).ops.iter().rev().copied().collect();
            for nested in ops {
                erase_op_recursive(ctx, nested);
            }
        }
    }
    ctx.erase_op(op);
}

/// Erase pure definitions of `values` that no longer have uses, following
/// their operands transitively.
///
/// Returns the number of erased operations.
pub fn erase_dead_defs(ctx: &mut IrContext, values: &[ValueRef]) -> usize {
    let mut worklist: Vec<ValueRef> = values.to_vec();
    let mut erased = 0;
    while let Some(v) = worklist.pop() {
        let Some(def) = ctx.defining_op(v) else {
            continue;
        };
        if ctx.op(def).parent_block.is_none() || !PureOps::is_removable(ctx, def) {
            continue;
        }
        worklist.extend_from_slice(ctx.op_operands(def));
        tracing::trace!(op = %def, "erasing dead definition");
        erase_op_recursive(ctx, def);
        erased += 1;
    }
    erased
}

//! Edit log of a single pattern application.
//!
//! Patterns build new ops detached and record here what should happen to
//! them. [`apply_mutations`] then splices everything in at once, so a
//! pattern never observes its own half-applied rewrite.

use smallvec::SmallVec;

use super::helpers;
use super::type_converter::TypeConverter;
use crate::context::IrContext;
use crate::refs::{OpRef, ValueRef};

pub(crate) struct Mutations {
    prefix_ops: Vec<OpRef>,
    replacement: Option<OpRef>,
    in_place: bool,
}

/// Handed to [`RewritePattern::match_and_rewrite`](super::RewritePattern).
pub struct PatternRewriter<'a> {
    type_converter: &'a TypeConverter,
    edits: Mutations,
}

impl<'a> PatternRewriter<'a> {
    pub fn new(type_converter: &'a TypeConverter) -> Self {
        Self {
            type_converter,
            edits: Mutations {
                prefix_ops: Vec::new(),
                replacement: None,
                in_place: false,
            },
        }
    }

    /// The converter every pattern of the current run shares.
    pub fn type_converter(&self) -> &'a TypeConverter {
        self.type_converter
    }

    /// Queue a detached op to land right before the matched op. Calls
    /// keep their order.
    pub fn insert_op(&mut self, op: OpRef) {
        self.edits.prefix_ops.push(op);
    }

    /// Queue `new_op` to take the matched op's place. Results are rewired
    /// by index; the matched op and pure definitions only it read are erased.
    pub fn replace_op(&mut self, new_op: OpRef) {
        debug_assert!(self.edits.replacement.is_none(), "replace_op called twice");
        self.edits.replacement = Some(new_op);
    }

    /// The pattern edited the matched op directly (retyped it, for one).
    pub fn modify_op_in_place(&mut self) {
        self.edits.in_place = true;
    }

    /// [`insert_op`](Self::insert_op) for each of `prefix`, then
    /// [`replace_op`](Self::replace_op).
    pub fn replace_with_prefix(&mut self, prefix: Vec<OpRef>, replacement: OpRef) {
        self.edits.prefix_ops.extend(prefix);
        self.replace_op(replacement);
    }

    pub(crate) fn has_mutations(&self) -> bool {
        let e = &self.edits;
        e.in_place || e.replacement.is_some() || !e.prefix_ops.is_empty()
    }

    pub(crate) fn take_mutations(self) -> Mutations {
        self.edits
    }
}

/// Splice a recorded rewrite of `matched` into the IR.
///
/// Order: prefix ops, then use rewiring, then the replacement, then erasure
/// of `matched` and of the pure definitions it alone kept alive.
pub(crate) fn apply_mutations(ctx: &mut IrContext, matched: OpRef, edits: Mutations) {
    let attached = ctx.op(matched).parent_block.is_some();
    if attached {
        for op in edits.prefix_ops {
            ctx.insert_op_before(matched, op);
        }
    }

    let Some(replacement) = edits.replacement else {
        return;
    };
    let old: SmallVec<[ValueRef; 4]> = ctx.op_results(matched).into();
    let new: SmallVec<[ValueRef; 4]> = ctx.op_results(replacement).into();
    debug_assert_eq!(old.len(), new.len(), "replacement for {matched} changes the result count");
    for (from, to) in old.into_iter().zip(new) {
        ctx.replace_all_uses(from, to);
    }
    if attached {
        ctx.insert_op_before(matched, replacement);
    }

    let operands: SmallVec<[ValueRef; 8]> = ctx.op_operands(matched).into();
    helpers::erase_op_recursive(ctx, matched);
    helpers::erase_dead_defs(ctx, &operands);
}

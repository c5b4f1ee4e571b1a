//! Fixpoint driver for rewrite patterns.
//!
//! One sweep visits every op under the module body, innermost regions
//! first. Ops are read from a copy of each block's op list, so anything a
//! pattern detached or erased in the meantime is recognized by its
//! `parent_block` and skipped.

use super::Module;
use super::conversion_target::{ConversionTarget, IllegalOp};
use super::pattern::RewritePattern;
use super::rewriter::{self, PatternRewriter};
use super::type_converter::TypeConverter;
use crate::context::IrContext;
use crate::refs::{BlockRef, OpRef, RegionRef};

/// Outcome of [`PatternApplicator::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyResult {
    /// Sweeps performed, including the final quiet one.
    pub iterations: usize,
    /// Successful pattern applications across all sweeps.
    pub total_changes: usize,
    pub reached_fixpoint: bool,
}

impl ApplyResult {
    /// Check the rewritten module against `target`.
    pub fn verify(
        &self,
        ctx: &IrContext,
        module: Module,
        target: &ConversionTarget,
    ) -> Result<(), Vec<IllegalOp>> {
        let leftovers = match module.body(ctx) {
            Some(body) => target.verify(ctx, body),
            None => Vec::new(),
        };
        if leftovers.is_empty() {
            Ok(())
        } else {
            Err(leftovers)
        }
    }
}

/// Ordered pattern set plus the converter patterns see through their rewriter.
pub struct PatternApplicator {
    patterns: Vec<Box<dyn RewritePattern>>,
    converter: TypeConverter,
    max_iterations: usize,
}

impl PatternApplicator {
    pub const DEFAULT_MAX_ITERATIONS: usize = 10;

    pub fn new(converter: TypeConverter) -> Self {
        Self {
            patterns: Vec::new(),
            converter,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Register `pattern` after those already added; earlier ones are tried first.
    pub fn add_pattern(mut self, pattern: impl RewritePattern + 'static) -> Self {
        self.patterns.push(Box::new(pattern));
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sweep until a sweep changes nothing or the iteration cap is hit.
    pub fn run(&self, ctx: &mut IrContext, module: Module) -> ApplyResult {
        let Some(body) = module.body(ctx) else {
            return ApplyResult {
                iterations: 0,
                total_changes: 0,
                reached_fixpoint: true,
            };
        };

        let mut total_changes = 0;
        for iteration in 1..=self.max_iterations {
            let changes = self.sweep_region(ctx, body);
            tracing::trace!(iteration, changes, "rewrite sweep");
            total_changes += changes;
            if changes == 0 {
                return ApplyResult {
                    iterations: iteration,
                    total_changes,
                    reached_fixpoint: true,
                };
            }
        }
        ApplyResult {
            iterations: self.max_iterations,
            total_changes,
            reached_fixpoint: false,
        }
    }

    fn sweep_region(&self, ctx: &mut IrContext, region: RegionRef) -> usize {
        let blocks: Vec<BlockRef> = ctx.region(region).blocks.to_vec();
        let mut changes = 0;
        for block in blocks {
            changes += self.sweep_block(ctx, block);
        }
        changes
    }

    fn sweep_block(&self, ctx: &mut IrContext, block: BlockRef) -> usize {
        let still_here = |ctx: &IrContext, op: OpRef| ctx.op(op).parent_block == Some(block);
        let snapshot: Vec<OpRef> = ctx.block(block).ops.to_vec();
        let mut changes = 0;

        for op in snapshot {
            if !still_here(ctx, op) {
                continue;
            }
            let nested: Vec<RegionRef> = ctx.op(op).regions.to_vec();
            changes += nested
                .into_iter()
                .map(|region| self.sweep_region(ctx, region))
                .sum::<usize>();

            if still_here(ctx, op) && self.rewrite(ctx, op) {
                changes += 1;
            }
        }
        changes
    }

    /// Offer `op` to each pattern in turn and apply the first recorded rewrite.
    fn rewrite(&self, ctx: &mut IrContext, op: OpRef) -> bool {
        for pattern in &self.patterns {
            let mut rw = PatternRewriter::new(&self.converter);
            if pattern.match_and_rewrite(ctx, op, &mut rw) && rw.has_mutations() {
                let data = ctx.op(op);
                tracing::debug!(
                    pattern = pattern.name(),
                    op = %format_args!("{}.{}", data.dialect, data.name),
                    "applied rewrite pattern"
                );
                rewriter::apply_mutations(ctx, op, rw.take_mutations());
                return true;
            }
        }
        false
    }
}

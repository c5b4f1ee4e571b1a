//! Bufferization of `csl_stencil.apply`.
//!
//! ```text
//! %r = csl_stencil.apply(%comm, %acc: tensor<T>, %a: tensor<T>, %dest) {
//!   ^bb0(%recv: tensor<NxZ>, %off: index, %acc0: tensor<T>, %a0: tensor<T>): ...
//! } {
//!   ^bb0(%in1: tensor<T>, %acc1: tensor<T>, %a1: tensor<T>): ...
//! }
//! ```
//!
//! becomes
//!
//! ```text
//! %acc_m = bufferization.to_memref %acc
//! %a_m = bufferization.to_memref %a
//! %r = csl_stencil.apply(%comm, %acc_m, %a_m, %dest) {
//!   ^bb0(%recv: memref<NxZ>, %off: index, %acc0: memref<T>, %a0: memref<T>):
//!     %acc0_t = bufferization.to_tensor %acc0 {writable = true}
//!     %chunk = tensor.extract_slice %acc0_t[%off] [Z] [1]
//!     %a0_t = bufferization.to_tensor %a0
//!     ... original body ...
//! } {
//!   ^bb0(%in1: memref<T>, %acc1: memref<T>, %a1: memref<T>):
//!     %in1_t = bufferization.to_tensor %in1
//!     %acc1_t = bufferization.to_tensor %acc1 {writable = true}
//!     %a1_t = bufferization.to_tensor %a1
//!     ... original body ...
//! }
//! ```
//!
//! The received neighbor data (`chunk_reduce` argument 0) is consumed as is
//! and never gets a tensor view.

use smallvec::{SmallVec, smallvec};
use stencil_ir::builtin::{self, DYNAMIC_INDEX};
use stencil_ir::dialect::csl_stencil::{self, chunk_reduce_arg, post_process_arg};
use stencil_ir::dialect::tensor;
use stencil_ir::rewrite::{PatternRewriter, RewritePattern, TypeConverter, helpers};
use stencil_ir::{
    Attribute, BlockArgData, BlockData, BlockRef, DialectOp, IrContext, Location, OpRef,
    RegionData, RegionRef, Symbol, TypeRef, ValueRef,
};

use super::views::{materialize_to_buffer, view_as_tensor};

/// Rebuild `csl_stencil.apply` over memref operands and block arguments.
///
/// Declines once the accumulator is a memref, so the rebuilt op is never
/// matched again.
pub struct ApplyOpBufferize;

impl RewritePattern for ApplyOpBufferize {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter,
    ) -> bool {
        let Ok(apply) = csl_stencil::Apply::from_op(ctx, op) else {
            return false;
        };
        let iter_arg = apply.iter_arg(ctx);
        let iter_ty = ctx.value_ty(iter_arg);
        if builtin::is_memref(&ctx.types, iter_ty) {
            return false;
        }
        assert!(
            builtin::is_tensor(&ctx.types, iter_ty),
            "csl_stencil.apply {op}: accumulator must be a tensor or a memref"
        );

        let location = ctx.op(op).location;

        // Operands: the accumulator and every tensor argument go through memory.
        let mut to_memrefs = Vec::new();
        let buf_iter_arg = materialize_to_buffer(ctx, location, iter_arg);
        to_memrefs.push(buf_iter_arg.op_ref());
        let buf_iter_arg = buf_iter_arg.result(ctx);

        let args: SmallVec<[ValueRef; 4]> = apply.args(ctx).into();
        let mut buf_args = Vec::with_capacity(args.len());
        for arg in args {
            if builtin::is_tensor(&ctx.types, ctx.value_ty(arg)) {
                let buf = materialize_to_buffer(ctx, location, arg);
                buf_args.push(buf.result(ctx));
                to_memrefs.push(buf.op_ref());
            } else {
                buf_args.push(arg);
            }
        }

        let old_chunk_reduce = entry_block(ctx, apply.chunk_reduce(ctx));
        let old_post_process = entry_block(ctx, apply.post_process(ctx));
        let converter = rewriter.type_converter();
        let (chunk_reduce, new_chunk_reduce) = bufferized_region(ctx, converter, old_chunk_reduce);
        let (post_process, new_post_process) = bufferized_region(ctx, converter, old_post_process);

        let communicated = apply.communicated_stencil(ctx);
        let dest = apply.dest(ctx);
        let result_types: SmallVec<[TypeRef; 2]> =
            ctx.op_results(op).iter().map(|&v| ctx.value_ty(v)).collect();
        let attrs: Vec<(Symbol, Attribute)> = ctx
            .op(op)
            .attributes
            .iter()
            .map(|(&k, v)| (k, v.clone()))
            .collect();
        let new_apply = csl_stencil::apply(
            ctx,
            location,
            communicated,
            buf_iter_arg,
            buf_args,
            dest,
            result_types,
            attrs,
            chunk_reduce,
            post_process,
        );

        let chunk_reduce_mapping =
            view_chunk_reduce_args(ctx, location, old_chunk_reduce, new_chunk_reduce);
        let post_process_mapping = view_block_args(
            ctx,
            location,
            old_post_process,
            new_post_process,
            |idx| idx == post_process_arg::ACCUMULATOR,
        );

        helpers::inline_block(ctx, old_chunk_reduce, new_chunk_reduce, &chunk_reduce_mapping);
        helpers::inline_block(ctx, old_post_process, new_post_process, &post_process_mapping);

        rewriter.replace_with_prefix(to_memrefs, new_apply.op_ref());
        true
    }
}

fn entry_block(ctx: &IrContext, region: RegionRef) -> BlockRef {
    match ctx.region(region).blocks.first() {
        Some(&block) => block,
        None => panic!("csl_stencil.apply: {region} has no block"),
    }
}

/// A fresh single-block region whose arguments mirror `old` with tensors
/// turned into memrefs.
fn bufferized_region(
    ctx: &mut IrContext,
    converter: &TypeConverter,
    old: BlockRef,
) -> (RegionRef, BlockRef) {
    let location = ctx.block(old).location;
    let arg_types: Vec<TypeRef> = ctx.block(old).args.iter().map(|a| a.ty).collect();
    let args = arg_types
        .into_iter()
        .map(|ty| {
            let ty = converter.convert_type(&mut ctx.types, ty).unwrap_or(ty);
            BlockArgData::new(ty)
        })
        .collect();
    let block = ctx.create_block(BlockData {
        location,
        args,
        ops: smallvec![],
        parent_region: None,
    });
    let region = ctx.create_region(RegionData {
        location,
        blocks: smallvec![block],
        parent_op: None,
    });
    (region, block)
}

/// Append a tensor view at the end of `new` for every argument that was a
/// tensor in `old` (minus those `skip` rejects), and return what each old
/// argument maps to.
fn view_args(
    ctx: &mut IrContext,
    location: Location,
    old: BlockRef,
    new: BlockRef,
    skip: impl Fn(usize) -> bool,
    writable: impl Fn(usize) -> bool,
    mut after_view: impl FnMut(&mut IrContext, usize, ValueRef),
) -> Vec<ValueRef> {
    let old_args: SmallVec<[ValueRef; 8]> = ctx.block_args(old).into();
    let new_args: SmallVec<[ValueRef; 8]> = ctx.block_args(new).into();

    old_args
        .iter()
        .zip(&new_args)
        .enumerate()
        .map(|(idx, (&old_arg, &new_arg))| {
            if skip(idx) || !builtin::is_tensor(&ctx.types, ctx.value_ty(old_arg)) {
                return new_arg;
            }
            let view = view_as_tensor(ctx, location, new_arg, writable(idx));
            ctx.push_op(new, view.op_ref());
            let tensor = view.result(ctx);
            after_view(ctx, idx, tensor);
            tensor
        })
        .collect()
}

fn view_block_args(
    ctx: &mut IrContext,
    location: Location,
    old: BlockRef,
    new: BlockRef,
    writable: impl Fn(usize) -> bool,
) -> Vec<ValueRef> {
    view_args(ctx, location, old, new, |_| false, writable, |_, _, _| {})
}

/// Like [`view_block_args`], but leaves the received data alone and adds the
/// per-chunk slice of the accumulator.
fn view_chunk_reduce_args(
    ctx: &mut IrContext,
    location: Location,
    old: BlockRef,
    new: BlockRef,
) -> Vec<ValueRef> {
    view_args(
        ctx,
        location,
        old,
        new,
        |idx| idx == chunk_reduce_arg::RECEIVED,
        |idx| idx == chunk_reduce_arg::ACCUMULATOR,
        |ctx, idx, tensor| {
            if idx == chunk_reduce_arg::ACCUMULATOR {
                let received_ty =
                    ctx.value_ty(ctx.block_arg(old, chunk_reduce_arg::RECEIVED as u32));
                let offset = ctx.block_arg(new, chunk_reduce_arg::OFFSET as u32);
                let slice = chunk_slice(ctx, location, tensor, offset, received_ty);
                ctx.push_op(new, slice);
            }
        },
    )
}

/// `tensor.extract_slice` of the current chunk out of the accumulator view.
///
/// The received data is `tensor<neighbors x Z x T>`; a chunk is
/// `tensor<Z x T>` starting at the dynamic `offset`.
fn chunk_slice(
    ctx: &mut IrContext,
    location: Location,
    accumulator: ValueRef,
    offset: ValueRef,
    received_ty: TypeRef,
) -> OpRef {
    let received = match builtin::as_tensor(&ctx.types, received_ty) {
        Some(shaped) if shaped.has_static_shape() && !shaped.shape.is_empty() => shaped,
        _ => panic!(
            "csl_stencil.apply: chunk_reduce received data must be a statically shaped tensor, found {received_ty}"
        ),
    };
    let sizes = &received.shape[1..];
    let result_ty = builtin::tensor(&mut ctx.types, received.element, sizes);
    tensor::extract_slice(
        ctx,
        location,
        accumulator,
        [offset],
        result_ty,
        &[DYNAMIC_INDEX],
        sizes,
        &[1],
    )
    .op_ref()
}

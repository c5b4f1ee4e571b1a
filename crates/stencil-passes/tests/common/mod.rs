//! Shared IR builders for the bufferization integration tests.

#![allow(dead_code)]

use smallvec::smallvec;
use stencil_ir::dialect::csl_stencil::post_process_arg;
use stencil_ir::dialect::{arith, core, csl_stencil, func};
use stencil_ir::types::DenseElements;
use stencil_ir::{
    Attribute, BlockArgData, BlockData, BlockRef, DialectOp, IrContext, Location, OpRef,
    RegionData, RegionRef, Span, Symbol, TypeRef, ValueRef, builtin,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

pub struct Kernel {
    pub ctx: IrContext,
    pub loc: Location,
    pub module: OpRef,
    pub entry: BlockRef,
    pub applies: Vec<csl_stencil::Apply>,
}

pub struct Types {
    pub t8: TypeRef,
    pub m8: TypeRef,
    pub t3x8: TypeRef,
    pub m3x8: TypeRef,
    pub index: TypeRef,
    pub i32: TypeRef,
}

pub fn types(ctx: &mut IrContext) -> Types {
    let f32_ty = builtin::f32(&mut ctx.types);
    Types {
        t8: builtin::tensor(&mut ctx.types, f32_ty, &[8]),
        m8: builtin::memref(&mut ctx.types, f32_ty, &[8]),
        t3x8: builtin::tensor(&mut ctx.types, f32_ty, &[3, 8]),
        m3x8: builtin::memref(&mut ctx.types, f32_ty, &[3, 8]),
        index: builtin::index(&mut ctx.types),
        i32: builtin::i32(&mut ctx.types),
    }
}

pub fn block(ctx: &mut IrContext, loc: Location, args: &[TypeRef]) -> BlockRef {
    ctx.create_block(BlockData {
        location: loc,
        args: args.iter().copied().map(BlockArgData::new).collect(),
        ops: smallvec![],
        parent_region: None,
    })
}

pub fn region(ctx: &mut IrContext, loc: Location, block: BlockRef) -> RegionRef {
    ctx.create_region(RegionData {
        location: loc,
        blocks: smallvec![block],
        parent_op: None,
    })
}

/// Append a `csl_stencil.apply` to `entry` whose accumulator is a fresh
/// `tensor<8xf32>` constant.
///
/// `chunk_reduce` reads the neighbor at `[0, 1]` out of the received data.
/// `post_process` takes `[input, accumulator, args...]` and yields the
/// accumulator.
pub fn push_apply(
    ctx: &mut IrContext,
    loc: Location,
    entry: BlockRef,
    comm: ValueRef,
    dest: ValueRef,
    args: &[ValueRef],
    received_ty: TypeRef,
) -> csl_stencil::Apply {
    let t = types(ctx);
    let zero = DenseElements::new(t.t8, vec![Attribute::FloatBits(0.0f64.to_bits())]);
    let acc = arith::r#const(ctx, loc, t.t8, zero);
    ctx.push_op(entry, acc.op_ref());

    let arg_types: Vec<TypeRef> = args.iter().map(|&a| ctx.value_ty(a)).collect();

    let mut cr_args = vec![received_ty, t.index, t.t8];
    cr_args.extend(&arg_types);
    let cr = block(ctx, loc, &cr_args);
    let recv = ctx.block_arg(cr, 0);
    let neighbor = csl_stencil::access(ctx, loc, recv, t.t8, &[0, 1], Some(&[0, 1]));
    let nv = neighbor.result(ctx);
    let cr_yield = csl_stencil::r#yield(ctx, loc, [nv]);
    ctx.push_op(cr, neighbor.op_ref());
    ctx.push_op(cr, cr_yield.op_ref());

    let mut pp_args = vec![t.t8, t.t8];
    pp_args.extend(&arg_types);
    let pp = block(ctx, loc, &pp_args);
    let pp_acc = ctx.block_arg(pp, post_process_arg::ACCUMULATOR as u32);
    let pp_yield = csl_stencil::r#yield(ctx, loc, [pp_acc]);
    ctx.push_op(pp, pp_yield.op_ref());

    let cr_region = region(ctx, loc, cr);
    let pp_region = region(ctx, loc, pp);
    let acc_v = acc.result(ctx);
    let apply = csl_stencil::apply(
        ctx,
        loc,
        comm,
        acc_v,
        args.iter().copied(),
        dest,
        [],
        [(Symbol::new("num_chunks"), Attribute::from(1_i64))],
        cr_region,
        pp_region,
    );
    ctx.push_op(entry, apply.op_ref());
    apply
}

/// `func.func @kernel(%in, %out: field<[0,64]xtensor<8xf32>>, %scale: i32)`
/// with two applies: one with a tensor argument, one with `%scale`.
pub fn kernel_with_received(received: impl FnOnce(&mut IrContext) -> TypeRef) -> Kernel {
    let mut ctx = IrContext::new();
    let path = ctx.paths.intern("file:///kernel.mlir".to_owned());
    let loc = Location::new(path, Span::new(0, 0));
    let t = types(&mut ctx);
    let received_ty = received(&mut ctx);
    let field = builtin::field(&mut ctx.types, t.t8, &[(0, 64)]);

    let entry = block(&mut ctx, loc, &[field, field, t.i32]);
    let input = ctx.block_arg(entry, 0);
    let output = ctx.block_arg(entry, 1);
    let scale = ctx.block_arg(entry, 2);

    let ones = DenseElements::new(t.t8, vec![Attribute::FloatBits(1.0f64.to_bits())]);
    let weights = arith::r#const(&mut ctx, loc, t.t8, ones);
    ctx.push_op(entry, weights.op_ref());
    let weights = weights.result(&ctx);

    let first = push_apply(&mut ctx, loc, entry, input, output, &[weights], received_ty);
    let second = push_apply(&mut ctx, loc, entry, output, input, &[scale], received_ty);
    let ret = func::r#return(&mut ctx, loc, []);
    ctx.push_op(entry, ret.op_ref());

    let body = region(&mut ctx, loc, entry);
    let sig = builtin::function(&mut ctx.types, &[field, field, t.i32], &[]);
    let f = func::func(&mut ctx, loc, Symbol::new("kernel"), sig, body);
    let top = block(&mut ctx, loc, &[]);
    ctx.push_op(top, f.op_ref());
    let top = region(&mut ctx, loc, top);
    let module = core::module(&mut ctx, loc, Symbol::new("kernel"), top).op_ref();

    Kernel {
        ctx,
        loc,
        module,
        entry,
        applies: vec![first, second],
    }
}

pub fn kernel() -> Kernel {
    kernel_with_received(|ctx| types(ctx).t3x8)
}

/// The bufferized applies, in program order.
pub fn applies(k: &Kernel) -> Vec<csl_stencil::Apply> {
    k.ctx
        .block(k.entry)
        .ops
        .iter()
        .filter_map(|&op| csl_stencil::Apply::from_op(&k.ctx, op).ok())
        .collect()
}

pub fn arg_types(ctx: &IrContext, region: RegionRef) -> Vec<TypeRef> {
    let block = ctx.region(region).blocks[0];
    ctx.block_args(block).iter().map(|&v| ctx.value_ty(v)).collect()
}

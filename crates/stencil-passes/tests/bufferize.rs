//! End-to-end tests for csl_stencil bufferization.
//!
//! Kernels are built through the public IR API, bufferized with the default
//! pipeline and then inspected structurally.

mod common;

use std::ops::ControlFlow;

use stencil_ir::dialect::csl_stencil::{chunk_reduce_arg, post_process_arg};
use stencil_ir::dialect::{arith, bufferization, csl_stencil};
use stencil_ir::printer::print_module;
use stencil_ir::walk::{self, WalkAction};
use stencil_ir::{Attribute, DialectOp, Module, Symbol, TypeRef, builtin};
use stencil_passes::bufferize::legality_target;
use stencil_passes::{BufferizeConfig, bufferize};

use common::{applies, arg_types, init_tracing, kernel, kernel_with_received, types};

#[test]
fn leaves_no_tensor_typed_stencil_values() {
    init_tracing();
    let mut k = kernel();
    bufferize(&mut k.ctx, k.module, &BufferizeConfig::default()).unwrap();

    let ctx = &k.ctx;
    let body = Module::new(ctx, k.module).and_then(|m| m.body(ctx)).unwrap();
    assert!(legality_target().verify(ctx, body).is_empty());

    let mut checked = 0;
    let _ = walk::walk_region::<()>(ctx, body, &mut |op| {
        let ty = if let Ok(access) = csl_stencil::Access::from_op(ctx, op) {
            Some(access.result_ty(ctx))
        } else if let Ok(c) = arith::Const::from_op(ctx, op) {
            Some(c.result_ty(ctx))
        } else {
            None
        };
        if let Some(ty) = ty {
            assert!(builtin::is_memref(&ctx.types, ty), "{op} still produces {ty}");
            checked += 1;
        }
        ControlFlow::Continue(WalkAction::Advance)
    });
    // Three constants and one access per apply.
    assert_eq!(checked, 5);
}

#[test]
fn region_arguments_convert_index_wise() {
    let mut k = kernel();
    let before: Vec<(Vec<TypeRef>, Vec<TypeRef>)> = k
        .applies
        .iter()
        .map(|a| {
            (
                arg_types(&k.ctx, a.chunk_reduce(&k.ctx)),
                arg_types(&k.ctx, a.post_process(&k.ctx)),
            )
        })
        .collect();

    bufferize(&mut k.ctx, k.module, &BufferizeConfig::default()).unwrap();
    let t = types(&mut k.ctx);
    let to_memref = |ty: TypeRef| {
        if ty == t.t8 {
            t.m8
        } else if ty == t.t3x8 {
            t.m3x8
        } else {
            ty
        }
    };

    let after = applies(&k);
    assert_eq!(after.len(), before.len());
    for (apply, (cr_before, pp_before)) in after.iter().zip(before) {
        let cr_after = arg_types(&k.ctx, apply.chunk_reduce(&k.ctx));
        let pp_after = arg_types(&k.ctx, apply.post_process(&k.ctx));
        assert_eq!(cr_after.len(), cr_before.len());
        assert_eq!(pp_after.len(), pp_before.len());
        assert_eq!(cr_after, cr_before.into_iter().map(to_memref).collect::<Vec<_>>());
        assert_eq!(pp_after, pp_before.into_iter().map(to_memref).collect::<Vec<_>>());
    }
    assert_eq!(
        arg_types(&k.ctx, after[1].chunk_reduce(&k.ctx)),
        vec![t.m3x8, t.index, t.m8, t.i32]
    );
}

#[test]
fn non_tensor_operands_pass_through() {
    let mut k = kernel();
    let input = k.ctx.block_arg(k.entry, 0);
    let output = k.ctx.block_arg(k.entry, 1);
    let scale = k.ctx.block_arg(k.entry, 2);

    bufferize(&mut k.ctx, k.module, &BufferizeConfig::default()).unwrap();

    let after = applies(&k);
    let ctx = &k.ctx;
    assert_eq!(after[0].communicated_stencil(ctx), input);
    assert_eq!(after[0].dest(ctx), output);
    assert_eq!(after[1].communicated_stencil(ctx), output);
    assert_eq!(after[1].dest(ctx), input);
    assert_eq!(after[1].args(ctx), &[scale]);
    for apply in &after {
        let attrs = &ctx.op(apply.op_ref()).attributes;
        assert_eq!(attrs.get(&Symbol::new("num_chunks")), Some(&Attribute::from(1_i64)));
    }
}

#[test]
fn access_keeps_offsets() {
    let mut k = kernel();
    bufferize(&mut k.ctx, k.module, &BufferizeConfig::default()).unwrap();

    let ctx = &k.ctx;
    let m8 = ctx.value_ty(applies(&k)[0].iter_arg(ctx));
    assert!(builtin::is_memref(&ctx.types, m8));
    for apply in applies(&k) {
        let accesses = walk::collect_typed::<csl_stencil::Access>(ctx, apply.chunk_reduce(ctx));
        assert_eq!(accesses.len(), 1);
        let access = accesses[0];
        assert_eq!(access.result_ty(ctx), m8);
        assert_eq!(access.offset(ctx), vec![0, 1]);
        assert_eq!(access.offset_mapping(ctx), Some(vec![0, 1]));

        // The received data is read directly from its buffer.
        let cr_block = ctx.region(apply.chunk_reduce(ctx)).blocks[0];
        assert_eq!(access.op(ctx), ctx.block_arg(cr_block, 0));
    }
}

#[test]
fn only_accumulators_get_writable_views() {
    let mut k = kernel();
    bufferize(&mut k.ctx, k.module, &BufferizeConfig::default()).unwrap();

    let ctx = &k.ctx;
    for apply in applies(&k) {
        for (region, acc_idx) in [
            (apply.chunk_reduce(ctx), chunk_reduce_arg::ACCUMULATOR),
            (apply.post_process(ctx), post_process_arg::ACCUMULATOR),
        ] {
            let block = ctx.region(region).blocks[0];
            let acc = ctx.block_arg(block, acc_idx as u32);
            let views = walk::collect_typed::<bufferization::ToTensor>(ctx, region);
            assert!(!views.is_empty());
            for view in views {
                assert_eq!(view.writable(ctx), view.memref(ctx) == acc, "{}", view.op_ref());
            }
        }
    }
}

#[test]
fn second_run_is_a_no_op() {
    let mut k = kernel();
    let first = bufferize(&mut k.ctx, k.module, &BufferizeConfig::default()).unwrap();
    assert!(first.total_changes > 0);
    let printed = print_module(&k.ctx, k.module);

    let second = bufferize(&mut k.ctx, k.module, &BufferizeConfig::default()).unwrap();
    assert_eq!(second.iterations, 1);
    assert_eq!(second.total_changes, 0);
    assert_eq!(print_module(&k.ctx, k.module), printed);
}

#[test]
fn location_survives_rebuild() {
    let mut k = kernel();
    bufferize(&mut k.ctx, k.module, &BufferizeConfig::default()).unwrap();
    for apply in applies(&k) {
        assert_eq!(k.ctx.op(apply.op_ref()).location, k.loc);
    }
}

#[test]
#[should_panic(expected = "statically shaped tensor")]
fn dynamic_received_shape_is_rejected() {
    let mut k = kernel_with_received(|ctx| {
        let f32_ty = builtin::f32(&mut ctx.types);
        builtin::tensor(&mut ctx.types, f32_ty, &[builtin::DYNAMIC_INDEX, 8])
    });
    let _ = bufferize(&mut k.ctx, k.module, &BufferizeConfig::default());
}

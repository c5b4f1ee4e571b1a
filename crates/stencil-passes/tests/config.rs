//! Bufferization under non-default configurations.

mod common;

use stencil_ir::dialect::func;
use stencil_ir::walk::collect_typed;
use stencil_ir::{Module, TypeKind, builtin};
use stencil_passes::{BufferizeConfig, BufferizeError, FieldConversion, bufferize};

use common::{Kernel, init_tracing, kernel, types};

fn kernel_func(k: &Kernel) -> func::Func {
    let body = Module::new(&k.ctx, k.module)
        .and_then(|m| m.body(&k.ctx))
        .unwrap();
    let funcs = collect_typed::<func::Func>(&k.ctx, body);
    assert_eq!(funcs.len(), 1);
    funcs[0]
}

fn signature_inputs(k: &Kernel) -> Vec<stencil_ir::TypeRef> {
    let f = kernel_func(k);
    match builtin::classify(&k.ctx.types, f.r#type(&k.ctx)) {
        TypeKind::Function(sig) => sig.inputs,
        other => panic!("unexpected func.func type {other:?}"),
    }
}

#[test]
fn element_only_keeps_field_wrapper() {
    let mut k = kernel();
    bufferize(&mut k.ctx, k.module, &BufferizeConfig::default()).unwrap();

    let t = types(&mut k.ctx);
    let field_m8 = builtin::field(&mut k.ctx.types, t.m8, &[(0, 64)]);
    let field_t8 = builtin::field(&mut k.ctx.types, t.t8, &[(0, 64)]);
    assert_eq!(signature_inputs(&k), vec![field_m8, field_m8, t.i32]);

    // Body arguments are left to the explicit function-argument stage.
    let entry: Vec<_> = k.ctx.block_args(k.entry).iter().map(|&v| k.ctx.value_ty(v)).collect();
    assert_eq!(entry, vec![field_t8, field_t8, t.i32]);
}

#[test]
fn unwrap_with_function_args_retypes_entry_block() {
    init_tracing();
    let mut k = kernel();
    let config = BufferizeConfig {
        field_conversion: FieldConversion::Unwrap,
        convert_function_args: true,
        ..BufferizeConfig::default()
    };
    let report = bufferize(&mut k.ctx, k.module, &config).unwrap();
    assert_eq!(report.function_args_converted, 2);

    let t = types(&mut k.ctx);
    assert_eq!(signature_inputs(&k), vec![t.m8, t.m8, t.i32]);
    let entry: Vec<_> = k.ctx.block_args(k.entry).iter().map(|&v| k.ctx.value_ty(v)).collect();
    assert_eq!(entry, vec![t.m8, t.m8, t.i32]);
    assert_eq!(kernel_func(&k).entry_block(&k.ctx), Some(k.entry));
}

#[test]
fn small_iteration_budget_is_an_error() {
    let mut k = kernel();
    let config = BufferizeConfig {
        max_iterations: 1,
        ..BufferizeConfig::default()
    };
    let err = bufferize(&mut k.ctx, k.module, &config).unwrap_err();
    assert!(matches!(err, BufferizeError::FixpointNotReached { iterations: 1 }));

    // A further run picks up where the first one stopped.
    let report = bufferize(&mut k.ctx, k.module, &BufferizeConfig::default()).unwrap();
    assert!(report.iterations >= 1);
}

#[test]
fn verification_can_be_skipped() {
    let mut k = kernel();
    let config = BufferizeConfig {
        verify: false,
        ..BufferizeConfig::default()
    };
    let report = bufferize(&mut k.ctx, k.module, &config).unwrap();
    assert!(report.total_changes > 0);
    assert_eq!(report.function_args_converted, 0);
}

//! Function body argument conversion.
//!
//! [`FuncOpBufferize`](super::FuncOpBufferize) only rewrites the declared
//! signature. This stage makes each `func.func` entry block agree with it.

use stencil_ir::builtin::{self, TypeKind};
use stencil_ir::dialect::func;
use stencil_ir::walk;
use stencil_ir::{IrContext, Module};

/// Retype `func.func` entry block arguments to their signature inputs.
///
/// Returns the number of arguments whose type changed.
pub fn convert_function_arguments(ctx: &mut IrContext, module: Module) -> usize {
    let Some(body) = module.body(ctx) else {
        return 0;
    };

    let mut converted = 0;
    for func_op in walk::collect_typed::<func::Func>(ctx, body) {
        let TypeKind::Function(sig) = builtin::classify(&ctx.types, func_op.r#type(ctx)) else {
            continue;
        };
        let Some(entry) = func_op.entry_block(ctx) else {
            continue;
        };
        let arg_types: Vec<_> = ctx.block(entry).args.iter().map(|a| a.ty).collect();
        if arg_types.len() != sig.inputs.len() {
            tracing::warn!(
                func = %func_op.sym_name(ctx),
                args = arg_types.len(),
                inputs = sig.inputs.len(),
                "entry block does not match signature, skipping"
            );
            continue;
        }

        for (idx, (old_ty, &new_ty)) in arg_types.into_iter().zip(&sig.inputs).enumerate() {
            if old_ty != new_ty {
                let arg = ctx.block_arg(entry, idx as u32);
                ctx.retype_value(arg, new_ty);
                converted += 1;
            }
        }
    }

    tracing::debug!(converted, "converted function arguments");
    converted
}

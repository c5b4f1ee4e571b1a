//! Bufferization of the csl_stencil dialect.
//!
//! Rewrites value-semantics tensors to reference-semantics memrefs inside
//! `csl_stencil.apply` computations and their surroundings:
//!
//! - `stencil.field<..xtensor<T>>` types become `stencil.field<..xmemref<T>>`
//!   (or plain `memref<T>` with [`FieldConversion::Unwrap`])
//! - `csl_stencil.apply` takes memref operands, and its regions take memref
//!   block arguments viewed back as tensors
//! - `csl_stencil.access` and tensor `arith.const` produce memrefs followed by
//!   a read-only tensor view
//! - `csl_stencil.yield` materializes tensor operands as memrefs
//! - `func.func` signatures convert field arguments and results
//!
//! The `chunk_reduce` region also gets a `tensor.extract_slice` of the
//! accumulator for the current chunk, which the linalg lifting downstream
//! relies on. Run no CSE between the two.
//!
//! Uses `RewritePattern` + `PatternApplicator` to reach a fixpoint; function
//! body arguments are converted afterwards by [`convert_function_arguments`]
//! when [`BufferizeConfig::convert_function_args`] is set.

mod apply;
mod func_args;
mod patterns;
mod types;
mod views;


use derive_more::{Display, Error};
use stencil_ir::dialect::{arith, csl_stencil};
use stencil_ir::rewrite::{ConversionTarget, IllegalOp, LegalityCheck, PatternApplicator};
use stencil_ir::{DialectOp, IrContext, Module, OpRef, builtin};

pub use apply::ApplyOpBufferize;
pub use func_args::convert_function_arguments;
pub use patterns::{
    AccessOpBufferize, ArithConstBufferize, FieldTypeConversion, FuncOpBufferize, YieldOpBufferize,
};
pub use types::{
    convert_field_type, convert_signature, memref_to_tensor_type, tensor_to_memref_type,
    type_converter,
};
pub use views::{materialize_to_buffer, view_as_tensor};

// =============================================================================
// Configuration
// =============================================================================

/// How `stencil.field<..xtensor<T>>` is bufferized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldConversion {
    /// Keep the field and convert its element: `stencil.field<..xmemref<T>>`.
    #[default]
    ElementOnly,
    /// Drop the field wrapper: `memref<T>`.
    Unwrap,
}

/// Configuration for bufferization.
#[derive(Debug, Clone)]
pub struct BufferizeConfig {
    /// Maximum fixpoint iterations of the pattern stage. Default: 10.
    pub max_iterations: usize,
    /// Field type conversion mode. Default: [`FieldConversion::ElementOnly`].
    pub field_conversion: FieldConversion,
    /// Retype `func.func` entry block arguments after the pattern stage.
    /// Default: false.
    pub convert_function_args: bool,
    /// Check that no tensor-typed stencil values remain. Default: true.
    pub verify: bool,
}

impl Default for BufferizeConfig {
    fn default() -> Self {
        Self {
            max_iterations: PatternApplicator::DEFAULT_MAX_ITERATIONS,
            field_conversion: FieldConversion::default(),
            convert_function_args: false,
            verify: true,
        }
    }
}

// =============================================================================
// Errors and results
// =============================================================================

pub type BufferizeResult<T> = Result<T, BufferizeError>;

#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum BufferizeError {
    #[display("bufferize expects a core.module as root operation")]
    NotAModule,
    #[display("bufferization did not reach a fixpoint within {iterations} iteration(s)")]
    FixpointNotReached { iterations: usize },
    #[display("{} tensor-typed operation(s) left after bufferization: {}", _0.len(), join_ops(_0))]
    IllegalOps(#[error(not(source))] Vec<IllegalOp>),
}

fn join_ops(ops: &[IllegalOp]) -> String {
    ops.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Statistics of one bufferization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferizeReport {
    /// Fixpoint iterations of the pattern stage.
    pub iterations: usize,
    /// Pattern applications.
    pub total_changes: usize,
    /// Function entry block arguments retyped.
    pub function_args_converted: usize,
}

// =============================================================================
// Pipeline Integration
// =============================================================================

/// Bufferize every csl_stencil computation in the module rooted at `root`.
///
/// The module is mutated in place. Running the pass again on its own output
/// changes nothing.
pub fn bufferize(
    ctx: &mut IrContext,
    root: OpRef,
    config: &BufferizeConfig,
) -> BufferizeResult<BufferizeReport> {
    let module = Module::new(ctx, root).ok_or(BufferizeError::NotAModule)?;
    let name = module.name(ctx).map(|s| s.to_string()).unwrap_or_default();
    let _span = tracing::info_span!("csl_stencil_bufferize", module = %name).entered();

    let applicator = PatternApplicator::new(type_converter())
        .add_pattern(FieldTypeConversion::new(config.field_conversion))
        .add_pattern(ApplyOpBufferize)
        .add_pattern(AccessOpBufferize)
        .add_pattern(YieldOpBufferize)
        .add_pattern(FuncOpBufferize::new(config.field_conversion))
        .add_pattern(ArithConstBufferize)
        .with_max_iterations(config.max_iterations);

    let result = applicator.run(ctx, module);
    if !result.reached_fixpoint {
        tracing::warn!(
            iterations = result.iterations,
            changes = result.total_changes,
            "bufferization did not converge"
        );
        return Err(BufferizeError::FixpointNotReached {
            iterations: result.iterations,
        });
    }

    let function_args_converted = if config.convert_function_args {
        convert_function_arguments(ctx, module)
    } else {
        0
    };

    if config.verify {
        result
            .verify(ctx, module, &legality_target())
            .map_err(BufferizeError::IllegalOps)?;
    }

    let report = BufferizeReport {
        iterations: result.iterations,
        total_changes: result.total_changes,
        function_args_converted,
    };
    tracing::debug!(?report, "bufferization finished");
    Ok(report)
}

/// Stencil values that must not stay tensor-typed after bufferization.
pub fn legality_target() -> ConversionTarget {
    let mut target = ConversionTarget::new();
    target.add_dynamic_check(|ctx, op| {
        let ty = if let Ok(apply) = csl_stencil::Apply::from_op(ctx, op) {
            ctx.value_ty(apply.iter_arg(ctx))
        } else if let Ok(access) = csl_stencil::Access::from_op(ctx, op) {
            access.result_ty(ctx)
        } else if let Ok(c) = arith::Const::from_op(ctx, op) {
            c.result_ty(ctx)
        } else {
            return None;
        };
        builtin::is_tensor(&ctx.types, ty).then_some(LegalityCheck::Illegal)
    });
    target
}

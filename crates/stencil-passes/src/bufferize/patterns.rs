//! Single-op bufferization patterns.

use smallvec::SmallVec;
use stencil_ir::dialect::{arith, csl_stencil, func};
use stencil_ir::rewrite::{PatternRewriter, RewritePattern};
use stencil_ir::{Attribute, DialectOp, IrContext, OpRef, Symbol, TypeRef, ValueRef, builtin};

use super::FieldConversion;
use super::types::{convert_field_type, convert_signature};
use super::views::{materialize_to_buffer, view_as_tensor};

/// Retype `stencil.field<..xtensor<T>>` wherever it appears on an op.
///
/// Updates result types, `Type` attributes and the block arguments of the
/// op's regions in place. `func.func` entry arguments are skipped: they
/// follow the signature and are handled by
/// [`convert_function_arguments`](super::convert_function_arguments).
pub struct FieldTypeConversion {
    mode: FieldConversion,
}

impl FieldTypeConversion {
    pub fn new(mode: FieldConversion) -> Self {
        Self { mode }
    }

    fn convert(&self, ctx: &mut IrContext, ty: TypeRef) -> Option<TypeRef> {
        convert_field_type(&mut ctx.types, ty, self.mode)
    }

    fn convert_values(&self, ctx: &mut IrContext, values: &[ValueRef]) -> bool {
        let mut changed = false;
        for &v in values {
            let ty = ctx.value_ty(v);
            if let Some(new_ty) = self.convert(ctx, ty) {
                ctx.retype_value(v, new_ty);
                changed = true;
            }
        }
        changed
    }
}

impl RewritePattern for FieldTypeConversion {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter,
    ) -> bool {
        let mut changed = false;

        let results: SmallVec<[ValueRef; 4]> = ctx.op_results(op).into();
        changed |= self.convert_values(ctx, &results);

        let type_attrs: Vec<(Symbol, TypeRef)> = ctx
            .op(op)
            .attributes
            .iter()
            .filter_map(|(&key, attr)| match attr {
                Attribute::Type(ty) => Some((key, *ty)),
                _ => None,
            })
            .collect();
        for (key, ty) in type_attrs {
            if let Some(new_ty) = self.convert(ctx, ty) {
                ctx.op_mut(op).attributes.insert(key, Attribute::Type(new_ty));
                changed = true;
            }
        }

        if !func::Func::matches(ctx, op) {
            let regions = ctx.op(op).regions.clone();
            for region in regions {
                let blocks = ctx.region(region).blocks.clone();
                for block in blocks {
                    let args: SmallVec<[ValueRef; 4]> = ctx.block_args(block).into();
                    changed |= self.convert_values(ctx, &args);
                }
            }
        }

        if changed {
            rewriter.modify_op_in_place();
        }
        changed
    }
}

/// `csl_stencil.access` with a tensor result reads into a memref, viewed
/// back as a read-only tensor.
pub struct AccessOpBufferize;

impl RewritePattern for AccessOpBufferize {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter,
    ) -> bool {
        let Ok(access) = csl_stencil::Access::from_op(ctx, op) else {
            return false;
        };
        let result_ty = access.result_ty(ctx);
        let Some(buffer_ty) = rewriter.type_converter().convert_type(&mut ctx.types, result_ty)
        else {
            return false;
        };

        let location = ctx.op(op).location;
        let source = access.op(ctx);
        let offset = access.offset(ctx);
        let offset_mapping = access.offset_mapping(ctx);
        let new_access = csl_stencil::access(
            ctx,
            location,
            source,
            buffer_ty,
            &offset,
            offset_mapping.as_deref(),
        );
        let buffer = new_access.result(ctx);
        let view = view_as_tensor(ctx, location, buffer, false);

        rewriter.insert_op(new_access.op_ref());
        rewriter.replace_op(view.op_ref());
        true
    }
}

/// `csl_stencil.yield` hands memrefs out of its region.
pub struct YieldOpBufferize;

impl RewritePattern for YieldOpBufferize {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter,
    ) -> bool {
        let Ok(yield_op) = csl_stencil::Yield::from_op(ctx, op) else {
            return false;
        };
        let location = ctx.op(op).location;
        let values: SmallVec<[ValueRef; 4]> = yield_op.values(ctx).into();

        let mut to_memrefs = Vec::new();
        let mut operands = Vec::with_capacity(values.len());
        for v in values {
            if builtin::is_tensor(&ctx.types, ctx.value_ty(v)) {
                let buf = materialize_to_buffer(ctx, location, v);
                operands.push(buf.result(ctx));
                to_memrefs.push(buf.op_ref());
            } else {
                operands.push(v);
            }
        }
        if to_memrefs.is_empty() {
            return false;
        }

        let new_yield = csl_stencil::r#yield(ctx, location, operands);
        rewriter.replace_with_prefix(to_memrefs, new_yield.op_ref());
        true
    }
}

/// Rebuild `func.func` with field arguments and results converted in its
/// signature. The body, including its entry block arguments, moves over
/// unchanged.
pub struct FuncOpBufferize {
    mode: FieldConversion,
}

impl FuncOpBufferize {
    pub fn new(mode: FieldConversion) -> Self {
        Self { mode }
    }
}

impl RewritePattern for FuncOpBufferize {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter,
    ) -> bool {
        let Ok(func_op) = func::Func::from_op(ctx, op) else {
            return false;
        };
        let sig = func_op.r#type(ctx);
        let Some(new_sig) = convert_signature(&mut ctx.types, sig, self.mode) else {
            return false;
        };

        let location = ctx.op(op).location;
        let sym_name = func_op.sym_name(ctx);
        let body = func_op.body(ctx);
        let extra_attrs: Vec<(Symbol, Attribute)> = ctx
            .op(op)
            .attributes
            .iter()
            .filter(|(key, _)| **key != "sym_name" && **key != "type")
            .map(|(&key, attr)| (key, attr.clone()))
            .collect();

        ctx.detach_region(body);
        let new_func = func::func(ctx, location, sym_name, new_sig, body);
        ctx.op_mut(new_func.op_ref()).attributes.extend(extra_attrs);

        rewriter.replace_op(new_func.op_ref());
        true
    }
}

/// Tensor `arith.const` becomes a memref constant with the same literal data,
/// viewed back as a read-only tensor. Keeps later bufferization from
/// promoting the literal to a global.
pub struct ArithConstBufferize;

impl RewritePattern for ArithConstBufferize {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter,
    ) -> bool {
        let Ok(c) = arith::Const::from_op(ctx, op) else {
            return false;
        };
        let result_ty = c.result_ty(ctx);
        let Some(buffer_ty) = rewriter.type_converter().convert_type(&mut ctx.types, result_ty)
        else {
            return false;
        };
        let Some(dense) = c.dense_value(ctx) else {
            panic!(
                "arith.const {op}: tensor constant must hold a dense elements literal, found {:?}",
                c.value(ctx)
            );
        };
        assert!(
            builtin::is_tensor(&ctx.types, dense.ty),
            "arith.const {op}: dense elements literal must be tensor-typed, found {}",
            dense.ty
        );
        let data = dense.with_type(buffer_ty);

        let location = ctx.op(op).location;
        let new_const = arith::r#const(ctx, location, buffer_ty, data);
        let buffer = new_const.result(ctx);
        let view = view_as_tensor(ctx, location, buffer, false);

        rewriter.insert_op(new_const.op_ref());
        rewriter.replace_op(view.op_ref());
        true
    }
}

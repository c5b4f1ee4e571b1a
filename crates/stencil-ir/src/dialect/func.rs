//! `func` dialect: functions and returns.

use crate::context::{IrContext, OpBuilder};
use crate::location::Location;
use crate::refs::{BlockRef, RegionRef, TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::Attribute;

crate::define_op! {
    /// `func.func`: named function whose signature lives in the `type` attribute.
    pub struct Func = "func"."func", attrs: ["sym_name", "type"], regions: 1;
}

impl Func {
    pub fn sym_name(&self, ctx: &IrContext) -> Symbol {
        match super::required_attr(ctx, self.0, "sym_name") {
            Attribute::Symbol(s) => *s,
            other => panic!("expected Symbol attribute, found {other:?}"),
        }
    }

    /// The `func.fn` signature type.
    pub fn r#type(&self, ctx: &IrContext) -> TypeRef {
        match super::required_attr(ctx, self.0, "type") {
            Attribute::Type(t) => *t,
            other => panic!("expected Type attribute, found {other:?}"),
        }
    }

    pub fn body(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }

    pub fn entry_block(&self, ctx: &IrContext) -> Option<BlockRef> {
        ctx.region(self.body(ctx)).blocks.first().copied()
    }
}

pub fn func(
    ctx: &mut IrContext,
    location: Location,
    sym_name: Symbol,
    r#type: TypeRef,
    body: RegionRef,
) -> Func {
    let op = OpBuilder::new(location, "func", "func")
        .attr("sym_name", Attribute::Symbol(sym_name))
        .attr("type", Attribute::Type(r#type))
        .region(body)
        .create(ctx);
    Func(op)
}

crate::define_op! {
    /// `func.return`
    pub struct Return = "func"."return";
}

impl Return {
    pub fn values<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.0)
    }
}

pub fn r#return(
    ctx: &mut IrContext,
    location: Location,
    values: impl IntoIterator<Item = ValueRef>,
) -> Return {
    let op = OpBuilder::new(location, "func", "return")
        .operands(values)
        .create(ctx);
    Return(op)
}

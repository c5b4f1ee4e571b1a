//! `core` dialect: the module container.

use crate::context::{IrContext, OpBuilder};
use crate::location::Location;
use crate::refs::RegionRef;
use crate::symbol::Symbol;
use crate::types::Attribute;

crate::define_op! {
    /// `core.module`: top-level container with a single body region.
    pub struct Module = "core"."module", regions: 1;
}

impl Module {
    pub fn body(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }

    pub fn sym_name(&self, ctx: &IrContext) -> Option<Symbol> {
        match ctx.op(self.0).attributes.get(&Symbol::new("sym_name")) {
            Some(Attribute::Symbol(s)) => Some(*s),
            _ => None,
        }
    }
}

pub fn module(ctx: &mut IrContext, location: Location, sym_name: Symbol, body: RegionRef) -> Module {
    let op = OpBuilder::new(location, "core", "module")
        .attr("sym_name", Attribute::Symbol(sym_name))
        .region(body)
        .create(ctx);
    Module(op)
}

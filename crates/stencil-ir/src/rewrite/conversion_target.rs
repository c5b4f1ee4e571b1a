//! Post-conversion legality.
//!
//! A target is a list of checks. Each check inspects one op and either
//! rules on it or passes; the first ruling wins and an op nobody rules on
//! is legal.

use std::ops::ControlFlow;

use derive_more::Display;

use crate::context::IrContext;
use crate::refs::{OpRef, RegionRef};
use crate::symbol::Symbol;
use crate::walk::{self, WalkAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegalityCheck {
    Legal,
    Illegal,
}

type CheckFn = dyn Fn(&IrContext, OpRef) -> Option<LegalityCheck>;

/// Legality rules, checked by [`ConversionTarget::verify`] after patterns ran.
#[derive(Default)]
pub struct ConversionTarget {
    checks: Vec<Box<CheckFn>>,
}

impl ConversionTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a check. Returning `None` defers to later checks.
    pub fn add_dynamic_check(
        &mut self,
        f: impl Fn(&IrContext, OpRef) -> Option<LegalityCheck> + 'static,
    ) {
        self.checks.push(Box::new(f));
    }

    pub fn is_legal(&self, ctx: &IrContext, op: OpRef) -> LegalityCheck {
        self.checks
            .iter()
            .find_map(|check| check(ctx, op))
            .unwrap_or(LegalityCheck::Legal)
    }

    /// Every illegal op nested in `body`, in pre-order.
    pub fn verify(&self, ctx: &IrContext, body: RegionRef) -> Vec<IllegalOp> {
        let mut found = Vec::new();
        let _ = walk::walk_region::<()>(ctx, body, &mut |op| {
            if self.is_legal(ctx, op) == LegalityCheck::Illegal {
                let data = ctx.op(op);
                found.push(IllegalOp {
                    op,
                    dialect: data.dialect,
                    name: data.name,
                });
            }
            ControlFlow::Continue(WalkAction::Advance)
        });
        found
    }
}

/// An op that failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{dialect}.{name} ({op})")]
pub struct IllegalOp {
    pub op: OpRef,
    pub dialect: Symbol,
    pub name: Symbol,
}

//! Typed wrappers over raw operations.
//!
//! A dialect op is a `Copy` newtype over [`OpRef`] that knows its
//! `dialect.name` pair. [`define_op!`](crate::define_op) generates the
//! wrapper and its [`DialectOp`] impl; each dialect module then adds
//! accessors and a constructor by hand.

use derive_more::{Display, Error};

use crate::context::IrContext;
use crate::refs::OpRef;

/// Error when viewing an operation as a specific dialect op.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ConversionError {
    /// Operation name doesn't match expected dialect.operation.
    #[display("expected {expected}, found {actual}")]
    WrongOperation {
        expected: &'static str,
        actual: String,
    },
    #[display("missing attribute `{_0}`")]
    MissingAttribute(#[error(not(source))] &'static str),
    #[display("attribute `{_0}` has the wrong kind")]
    WrongAttributeType(#[error(not(source))] &'static str),
    #[display("expected {expected} region(s), found {actual}")]
    WrongRegionCount { expected: usize, actual: usize },
    #[display("expected at least {expected} operand(s), found {actual}")]
    WrongOperandCount { expected: usize, actual: usize },
}

/// Trait for typed dialect operation wrappers.
pub trait DialectOp: Sized + Copy {
    const DIALECT_NAME: &'static str;
    const OP_NAME: &'static str;

    fn from_op(ctx: &IrContext, op: OpRef) -> Result<Self, ConversionError>;
    fn op_ref(&self) -> OpRef;

    fn matches(ctx: &IrContext, op: OpRef) -> bool {
        let data = ctx.op(op);
        data.dialect == Self::DIALECT_NAME && data.name == Self::OP_NAME
    }
}

/// Define a dialect op wrapper struct with its [`DialectOp`] impl.
///
/// Optional requirements are checked by `from_op`: attributes that must be
/// present, the exact region count and a minimum operand count.
///
/// ```
/// use stencil_ir::{DialectOp, IrContext, Location, OpBuilder, PathRef, Span};
///
/// stencil_ir::define_op! {
///     /// `demo.nop`
///     pub struct Nop = "demo"."nop", attrs: ["tag"];
/// }
///
/// let mut ctx = IrContext::new();
/// let loc = Location::new(PathRef::from_u32(0), Span::default());
/// let op = OpBuilder::new(loc, "demo", "nop").create(&mut ctx);
/// assert!(Nop::from_op(&ctx, op).is_err());
/// ```
#[macro_export]
macro_rules! define_op {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident = $dialect:literal . $op:literal
        $(, attrs: [$($attr:literal),* $(,)?])?
        $(, regions: $regions:literal)?
        $(, operands: $operands:literal)?
        ;
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        $vis struct $name($crate::OpRef);

        impl $crate::DialectOp for $name {
            const DIALECT_NAME: &'static str = $dialect;
            const OP_NAME: &'static str = $op;

            fn from_op(
                ctx: &$crate::IrContext,
                op: $crate::OpRef,
            ) -> Result<Self, $crate::ConversionError> {
                let data = ctx.op(op);
                if !<Self as $crate::DialectOp>::matches(ctx, op) {
                    return Err($crate::ConversionError::WrongOperation {
                        expected: concat!($dialect, ".", $op),
                        actual: format!("{}.{}", data.dialect, data.name),
                    });
                }
                $($(
                    if !data.attributes.contains_key(&$crate::Symbol::new($attr)) {
                        return Err($crate::ConversionError::MissingAttribute($attr));
                    }
                )*)?
                $(
                    if data.regions.len() != $regions {
                        return Err($crate::ConversionError::WrongRegionCount {
                            expected: $regions,
                            actual: data.regions.len(),
                        });
                    }
                )?
                $(
                    let actual = ctx.op_operands(op).len();
                    if actual < $operands {
                        return Err($crate::ConversionError::WrongOperandCount {
                            expected: $operands,
                            actual,
                        });
                    }
                )?
                Ok(Self(op))
            }

            fn op_ref(&self) -> $crate::OpRef {
                self.0
            }
        }

        impl $name {
            /// Get the underlying OpRef.
            pub fn op_ref(&self) -> $crate::OpRef {
                self.0
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_error_messages() {
        let err = ConversionError::WrongOperation {
            expected: "csl_stencil.apply",
            actual: "func.func".to_owned(),
        };
        assert_eq!(err.to_string(), "expected csl_stencil.apply, found func.func");
        assert_eq!(
            ConversionError::MissingAttribute("value").to_string(),
            "missing attribute `value`"
        );
    }
}

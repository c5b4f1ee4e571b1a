//! Stencil IR crate.
//!
//! Arena-allocated, mutable multi-dialect IR used by the csl_stencil
//! lowering passes. All entities live in an [`IrContext`]; references are
//! `Copy` indices, use-chains are maintained on every mutation, and the
//! [`rewrite`] module drives pattern-based rewrites to a fixpoint.

// === Core entities ===
pub mod builtin;
pub mod context;
pub mod location;
pub mod refs;
pub mod symbol;
pub mod types;

// === Dialect modules ===
pub mod dialect;

// === IR infrastructure ===
pub mod op_interface;
pub mod ops;
pub mod printer;
pub mod rewrite;
pub mod walk;

pub use builtin::TypeKind;
pub use context::{BlockArgData, BlockData, IrContext, OpBuilder, OperationData, RegionData};
pub use location::{Location, Span};
pub use ops::{ConversionError, DialectOp};
pub use refs::{BlockRef, OpRef, PathRef, RegionRef, TypeRef, ValueDef, ValueRef};
pub use rewrite::Module;
pub use symbol::Symbol;
pub use types::{Attribute, PathInterner, TypeData, TypeDataBuilder, TypeInterner};
pub use walk::WalkAction;

// Re-export smallvec for use in macros and external crates
pub use smallvec;

//! Handles into the arenas of [`IrContext`](crate::IrContext).

use cranelift_entity::entity_impl;

macro_rules! handles {
    ($($(#[$meta:meta])* $handle:ident => $prefix:literal;)*) => {$(
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $handle(u32);
        entity_impl!($handle, $prefix);
    )*};
}

handles! {
    OpRef => "op";
    /// An SSA value: an op result or a block argument.
    ValueRef => "v";
    BlockRef => "block";
    RegionRef => "region";
    /// Hash-consed in [`TypeInterner`](crate::TypeInterner), so equal types
    /// share a handle.
    TypeRef => "ty";
    /// A source file name, shared by every [`Location`](crate::Location) in it.
    PathRef => "path";
}

/// Producer of a value, with the position among its siblings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueDef {
    OpResult(OpRef, u32),
    BlockArg(BlockRef, u32),
}

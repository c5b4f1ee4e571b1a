//! Dialect, op and attribute names.
//!
//! Every name the IR uses is a compile-time string, so the table only ever
//! holds `&'static str` and a [`Symbol`] is a four-byte key into it.

use std::fmt;
use std::sync::LazyLock;

use lasso::{Rodeo, Spur};
use parking_lot::RwLock;

static NAMES: LazyLock<RwLock<Rodeo>> = LazyLock::new(Default::default);

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(Spur);

impl Symbol {
    pub fn new(name: &'static str) -> Self {
        let known = NAMES.read_recursive().get(name);
        Symbol(known.unwrap_or_else(|| NAMES.write().get_or_intern_static(name)))
    }

    /// Run `f` on the name. Nested symbol lookups inside `f` are fine.
    fn read<R>(self, f: impl FnOnce(&str) -> R) -> R {
        f(NAMES.read_recursive().resolve(&self.0))
    }
}

impl From<&'static str> for Symbol {
    fn from(name: &'static str) -> Self {
        Symbol::new(name)
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        self.read(|name| name == *other)
    }
}

impl PartialEq<Symbol> for &str {
    fn eq(&self, other: &Symbol) -> bool {
        other == self
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read(|name| f.write_str(name))
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read(|name| write!(f, "`{name}`"))
    }
}

/// Define zero-argument functions returning fixed symbols, for names a
/// module matches on often.
///
/// ```
/// stencil_ir::symbols! {
///     ATTR_SWAPS => "swaps",
/// }
///
/// assert_eq!(ATTR_SWAPS(), "swaps");
/// ```
#[macro_export]
macro_rules! symbols {
    ($($(#[$meta:meta])* $func:ident => $name:literal),* $(,)?) => {$(
        $(#[$meta])*
        #[allow(non_snake_case)]
        pub fn $func() -> $crate::Symbol {
            $crate::Symbol::new($name)
        }
    )*};
}

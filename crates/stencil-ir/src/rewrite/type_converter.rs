//! Type mapping consulted by conversion patterns.

use crate::refs::TypeRef;
use crate::types::TypeInterner;

type ConversionFn = dyn Fn(&mut TypeInterner, TypeRef) -> Option<TypeRef>;

/// An ordered list of type conversions.
///
/// A conversion returns `None` for types it leaves alone; the first one
/// that returns `Some` decides the converted type.
#[derive(Default)]
pub struct TypeConverter {
    conversions: Vec<Box<ConversionFn>>,
}

impl TypeConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_conversion(
        &mut self,
        f: impl Fn(&mut TypeInterner, TypeRef) -> Option<TypeRef> + 'static,
    ) {
        self.conversions.push(Box::new(f));
    }

    /// The converted form of `ty`, or `None` if it is already legal.
    pub fn convert_type(&self, types: &mut TypeInterner, ty: TypeRef) -> Option<TypeRef> {
        self.conversions.iter().find_map(|conv| conv(types, ty))
    }
}

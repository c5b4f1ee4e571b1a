//! Transformation passes for the csl_stencil dialect.
//!
//! - [`bufferize`]: rewrite tensor-typed stencil computations to memref form.

pub mod bufferize;

pub use bufferize::{
    BufferizeConfig, BufferizeError, BufferizeReport, BufferizeResult, FieldConversion, bufferize,
};

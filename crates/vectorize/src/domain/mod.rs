//! Domain Layer - kernel language, signatures, registry keys
//!
//! RULES:
//! - No I/O operations
//! - No execution; evaluation lives in `compile` and `backends`

pub mod array;
pub mod kernel;
pub mod signature;
pub mod strategy;

pub use array::NdArray;
pub use kernel::{BinaryOp, Expr, GuFunction, ScalarFunction, UnaryOp};
pub use signature::GuSignature;
pub use strategy::{Strategy, Target, VectorizerKind};

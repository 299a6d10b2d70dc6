//! # Vectorize: Strategy/Target Vectorizer Registry
//!
//! Turns a scalar kernel into an elementwise ufunc, or a core-block kernel
//! into a generalized ufunc, picking the implementation from two registry
//! keys:
//!
//! - **strategy** (`backend`): how the kernel is compiled (`bytecode`, `ast`, `mini`)
//! - **target**: where it runs (`cpu`, `parallel`, `stream`, `gpu`)
//!
//! ## GPU Fallback
//!
//! The `gpu` target runs on OpenCL when the crate is built with the
//! `opencl` feature and a double-precision device is found. Otherwise the
//! registry binds `ast/gpu` to the CPU vectorizer and logs one warning when
//! it is built; requests for `gpu` keep succeeding.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): kernel language, signatures, arrays, registry keys
//! - **Compile Layer** (`compile/`): lowering plus the three strategies
//! - **Backends** (`backends/`): vectorizers and their executors
//! - **Registry** (`registry`): `(Strategy, Target)` lookup tables
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vectorize::{vectorize_with, Expr, ScalarFunction};
//!
//! let x = Expr::arg(0);
//! let func = ScalarFunction::new("softplus", 1, (x.exp() + 1.0).ln())?;
//! let ufunc = vectorize_with(func, "ast", "parallel")?.build_ufunc()?;
//! let ys = ufunc.call(&[&[0.0, 1.0, 2.0]])?;
//! ```

pub mod backends;
pub mod compile;
pub mod config;
pub mod domain;
pub mod error;
pub mod registry;

pub use backends::gpu::{DeviceInfo, GpuDevice};
pub use backends::{GuUfunc, GuVectorizer, Ufunc, Vectorizer};
pub use config::VectorizeConfig;
pub use domain::{
    BinaryOp, Expr, GuFunction, GuSignature, NdArray, ScalarFunction, Strategy, Target, UnaryOp,
    VectorizerKind,
};
pub use error::{ConfigurationError, GpuSupportError, KernelError, SignatureError, VectorizeError};
pub use registry::{Registry, RegistryBuilder};

/// Vectorize `func` with the default strategy (`ast`) and target (`cpu`)
/// from the global registry.
pub fn vectorize(func: ScalarFunction) -> Result<Box<dyn Vectorizer>, ConfigurationError> {
    Registry::global().vectorize(func, Strategy::default(), Target::default())
}

/// Vectorize `func` from the global registry with a named backend and target.
pub fn vectorize_with(
    func: ScalarFunction,
    backend: &str,
    target: &str,
) -> Result<Box<dyn Vectorizer>, ConfigurationError> {
    Registry::global().vectorize_named(func, backend, target)
}

/// Build a generalized ufunc vectorizer with the default strategy and target.
pub fn gu_vectorize(
    func: GuFunction,
    signature: GuSignature,
) -> Result<Box<dyn GuVectorizer>, ConfigurationError> {
    Registry::global().gu_vectorize(func, signature, Strategy::default(), Target::default())
}

/// Build a generalized ufunc vectorizer with a named backend and target.
pub fn gu_vectorize_with(
    func: GuFunction,
    signature: GuSignature,
    backend: &str,
    target: &str,
) -> Result<Box<dyn GuVectorizer>, ConfigurationError> {
    Registry::global().gu_vectorize_named(func, signature, backend, target)
}

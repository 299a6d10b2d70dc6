//! Error types for the vectorizer registry and its collaborators

use thiserror::Error;

/// Renders a list of accepted values as `a, b, c`.
pub(crate) fn join_valid<T: std::fmt::Display>(valid: &[T]) -> String {
    valid
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Invalid registry requests and invalid configuration values.
///
/// Raised before any vectorizer constructor is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("unknown backend '{value}' (valid: {})", join_valid(.valid))]
    UnknownBackend { value: String, valid: Vec<String> },

    #[error("unknown target '{value}' (valid: {})", join_valid(.valid))]
    UnknownTarget { value: String, valid: Vec<String> },

    #[error("backend '{backend}' is not registered (valid: {})", join_valid(.valid))]
    UnsupportedBackend { backend: String, valid: Vec<String> },

    #[error(
        "target '{target}' is not available for backend '{backend}' (valid: {})",
        join_valid(.valid)
    )]
    UnsupportedTarget {
        backend: String,
        target: String,
        valid: Vec<String>,
    },

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// GPU capability could not be acquired.
///
/// The registry recovers from this by aliasing gpu targets to the CPU
/// vectorizers; callers of `vectorize`/`gu_vectorize` never see it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpuSupportError {
    #[error("GPU support disabled by configuration")]
    Disabled,

    #[error("built without GPU support (enable the `opencl` feature)")]
    NotCompiled,

    #[error("no OpenCL platform available: {0}")]
    NoPlatform(String),

    #[error("no OpenCL device available: {0}")]
    NoDevice(String),

    #[error("device lacks double precision support: {0}")]
    NoDoublePrecision(String),

    #[error("GPU initialization failed: {0}")]
    Initialization(String),
}

/// Invalid kernel expressions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("argument {index} out of range for function of arity {arity}")]
    ArgumentOutOfRange { index: usize, arity: usize },

    #[error("{node} is only valid inside a generalized ufunc kernel")]
    GuOnlyNode { node: &'static str },

    #[error("scalar arguments are not valid inside a generalized ufunc kernel")]
    ScalarArgInGuKernel,

    #[error("operand {operand} out of range for signature with {inputs} inputs")]
    OperandOutOfRange { operand: usize, inputs: usize },

    #[error("operand {operand} indexed with {got} dimensions, core rank is {expected}")]
    IndexRankMismatch {
        operand: usize,
        expected: usize,
        got: usize,
    },

    #[error("dimension '{0}' is not declared by the signature")]
    UnknownDimension(String),

    #[error("dimension '{0}' is used outside of an output index or enclosing sum")]
    UnboundDimension(String),
}

/// Malformed generalized ufunc signatures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("malformed signature '{signature}': {reason}")]
    Malformed { signature: String, reason: String },

    #[error("signature must declare at least one input")]
    NoInputs,

    #[error("only a single output is supported, found {0}")]
    MultipleOutputs(usize),

    #[error("output dimension '{0}' does not appear in any input")]
    OutputOnlyDimension(String),

    #[error("output dimension '{0}' appears more than once")]
    RepeatedOutputDimension(String),
}

/// Errors raised while building or calling a vectorized function.
#[derive(Debug, Error)]
pub enum VectorizeError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Gpu(#[from] GpuSupportError),

    #[error("expected {expected} arguments, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("argument {index} has length {len}, expected {expected} or 1")]
    LengthMismatch {
        index: usize,
        len: usize,
        expected: usize,
    },

    #[error("array shape {shape:?} does not hold {len} elements")]
    ShapeMismatch { shape: Vec<usize>, len: usize },

    #[error("input {index} has {ndim} dimensions, core signature needs at least {core}")]
    MissingCoreDimensions {
        index: usize,
        ndim: usize,
        core: usize,
    },

    #[error("dimension '{dim}' bound to both {first} and {second}")]
    DimensionMismatch {
        dim: String,
        first: usize,
        second: usize,
    },

    #[error("input {index} has loop shape {got:?}, expected {expected:?}")]
    LoopShapeMismatch {
        index: usize,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("operand {operand} axis {axis}: '{dim}' extent {extent} exceeds axis extent {bound}")]
    AccessOutOfBounds {
        operand: usize,
        axis: usize,
        dim: String,
        extent: usize,
        bound: usize,
    },

    #[error("output shape {shape:?} overflows the addressable element count")]
    OutputTooLarge { shape: Vec<usize> },

    #[error("GPU launch failed: {0}")]
    Launch(String),
}

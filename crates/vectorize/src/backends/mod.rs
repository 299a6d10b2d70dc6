//! Vectorizer backends
//!
//! Each backend pairs a compile strategy with an executor:
//!
//! | Module | Vectorizers | Executor |
//! |--------|-------------|----------|
//! | `basic` | `BasicVectorize`, `BasicAstVectorize` | serial loop |
//! | `parallel` | `ParallelVectorize`, `ParallelAstVectorize` | rayon |
//! | `stream` | `StreamVectorize`, `StreamAstVectorize` | chunked scratch buffers |
//! | `mini` | `MiniVectorize`, `ParallelMiniVectorize` | serial / rayon |
//! | `gufunc` | `GuFuncVectorize`, `GuFuncAstVectorize` | serial loop over loop dims |
//! | `gpu` | `GpuAstVectorize`, `GpuGuFuncAstVectorize` | OpenCL |
//!
//! GPU backends detect hardware when the registry is built and are replaced
//! by the CPU vectorizers when no device is available.

pub mod basic;
pub mod gpu;
pub mod gufunc;
pub mod mini;
pub mod parallel;
pub mod stream;

use crate::compile::lower::{lower_scalar, Program};
use crate::compile::{compile, Env, Kernel};
use crate::domain::array::{element_count, row_major_strides};
use crate::domain::{GuFunction, GuSignature, NdArray, ScalarFunction, Strategy, VectorizerKind};
use crate::error::VectorizeError;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Builds elementwise ufuncs from a scalar function.
pub trait Vectorizer: Send + Sync {
    fn kind(&self) -> VectorizerKind;

    fn function(&self) -> &ScalarFunction;

    /// Compile the function and bind it to this vectorizer's executor.
    fn build_ufunc(&self) -> Result<Ufunc, VectorizeError>;
}

/// Builds generalized ufuncs from a core-block function and its signature.
pub trait GuVectorizer: Send + Sync {
    fn kind(&self) -> VectorizerKind;

    fn function(&self) -> &GuFunction;

    fn signature(&self) -> &GuSignature;

    fn build_ufunc(&self) -> Result<GuUfunc, VectorizeError>;
}

impl fmt::Debug for dyn Vectorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vectorizer")
            .field("kind", &self.kind())
            .field("function", &self.function().name())
            .finish()
    }
}

impl fmt::Debug for dyn GuVectorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuVectorizer")
            .field("kind", &self.kind())
            .field("function", &self.function().name())
            .field("signature", &self.signature().to_string())
            .finish()
    }
}

/// Runs a compiled elementwise kernel over `len` broadcast elements.
pub trait ElementwiseExecutor: Send + Sync {
    fn run(&self, args: &[&[f64]], len: usize) -> Result<Vec<f64>, VectorizeError>;
}

/// Runs a compiled gufunc kernel over a bound call.
pub trait GuExecutor: Send + Sync {
    fn run(&self, call: &BoundCall<'_>) -> Result<Vec<f64>, VectorizeError>;
}

/// Lower and compile a scalar function.
pub(crate) fn compile_scalar(
    func: &ScalarFunction,
    strategy: Strategy,
) -> Result<Arc<dyn Kernel>, VectorizeError> {
    let program = lower_scalar(func)?;
    Ok(compile(strategy, &program))
}

/// Evaluate `range` of the broadcast call into `out` (one slot per element of `range`).
pub(crate) fn eval_range(
    kernel: &dyn Kernel,
    args: &[&[f64]],
    range: Range<usize>,
    out: &mut [f64],
) {
    let mut scalars = vec![0.0; args.len()];
    for (slot, i) in out.iter_mut().zip(range) {
        for (value, arg) in scalars.iter_mut().zip(args) {
            *value = if arg.len() == 1 { arg[0] } else { arg[i] };
        }
        *slot = kernel.eval(&mut Env::scalar(&scalars));
    }
}

/// Common length of a broadcast call: every argument has length `n` or 1.
fn broadcast_len(args: &[&[f64]]) -> Result<usize, VectorizeError> {
    let mut len: Option<usize> = None;
    for (index, arg) in args.iter().enumerate() {
        if arg.len() == 1 {
            continue;
        }
        match len {
            None => len = Some(arg.len()),
            Some(expected) if expected != arg.len() => {
                return Err(VectorizeError::LengthMismatch {
                    index,
                    len: arg.len(),
                    expected,
                });
            }
            Some(_) => {}
        }
    }
    Ok(len.unwrap_or(1))
}

/// A compiled elementwise function.
pub struct Ufunc {
    name: String,
    arity: usize,
    kind: VectorizerKind,
    executor: Box<dyn ElementwiseExecutor>,
}

impl Ufunc {
    pub(crate) fn new(
        func: &ScalarFunction,
        kind: VectorizerKind,
        executor: Box<dyn ElementwiseExecutor>,
    ) -> Self {
        tracing::debug!(
            kind = %kind,
            name = func.name(),
            arity = func.arity(),
            "Built ufunc"
        );
        Self {
            name: func.name().to_string(),
            arity: func.arity(),
            kind,
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn kind(&self) -> VectorizerKind {
        self.kind
    }

    /// Apply the function elementwise. Length-1 arguments are broadcast.
    pub fn call(&self, args: &[&[f64]]) -> Result<Vec<f64>, VectorizeError> {
        if args.len() != self.arity {
            return Err(VectorizeError::ArityMismatch {
                expected: self.arity,
                got: args.len(),
            });
        }
        let len = broadcast_len(args)?;
        tracing::trace!(kind = %self.kind, name = %self.name, len, "Calling ufunc");
        self.executor.run(args, len)
    }
}

/// A gufunc call with every dimension bound to an extent.
pub struct BoundCall<'a> {
    pub inputs: &'a [NdArray],
    /// Extent of every dimension slot
    pub extents: Vec<usize>,
    /// Number of loop iterations (product of the loop shape)
    pub loop_count: usize,
    /// Elements in each input's core block
    pub core_sizes: Vec<usize>,
    /// Inputs without loop dimensions, reused by every iteration
    pub broadcast: Vec<bool>,
    /// Row-major strides of each input's core block
    pub core_strides: Vec<Vec<usize>>,
    /// Elements in the output core block
    pub output_core_size: usize,
}

impl BoundCall<'_> {
    /// Core block of input `k` for loop iteration `l`.
    pub fn core_block(&self, k: usize, l: usize) -> &[f64] {
        let size = self.core_sizes[k];
        let start = if self.broadcast[k] { 0 } else { l * size };
        &self.inputs[k].data()[start..start + size]
    }
}

/// A compiled generalized ufunc.
pub struct GuUfunc {
    name: String,
    signature: GuSignature,
    kind: VectorizerKind,
    program: Program,
    executor: Box<dyn GuExecutor>,
}

impl GuUfunc {
    pub(crate) fn new(
        func: &GuFunction,
        signature: &GuSignature,
        kind: VectorizerKind,
        program: Program,
        executor: Box<dyn GuExecutor>,
    ) -> Self {
        tracing::debug!(
            kind = %kind,
            name = func.name(),
            signature = %signature,
            "Built gufunc"
        );
        Self {
            name: func.name().to_string(),
            signature: signature.clone(),
            kind,
            program,
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &GuSignature {
        &self.signature
    }

    pub fn kind(&self) -> VectorizerKind {
        self.kind
    }

    /// Apply the gufunc. Leading dimensions of each input are loop
    /// dimensions; an input without loop dimensions is broadcast.
    pub fn call(&self, inputs: &[NdArray]) -> Result<NdArray, VectorizeError> {
        let (call, output_shape) = self.bind(inputs)?;
        tracing::trace!(
            kind = %self.kind,
            name = %self.name,
            loops = call.loop_count,
            "Calling gufunc"
        );
        let data = self.executor.run(&call)?;
        NdArray::new(output_shape, data)
    }

    fn bind<'a>(
        &self,
        inputs: &'a [NdArray],
    ) -> Result<(BoundCall<'a>, Vec<usize>), VectorizeError> {
        let program = &self.program;
        if inputs.len() != program.input_slots.len() {
            return Err(VectorizeError::ArityMismatch {
                expected: program.input_slots.len(),
                got: inputs.len(),
            });
        }

        let mut extents: Vec<Option<usize>> = vec![None; program.slot_count()];
        let mut loop_shape: Option<&[usize]> = None;
        let mut core_sizes = Vec::with_capacity(inputs.len());
        let mut broadcast = Vec::with_capacity(inputs.len());
        let mut core_strides = Vec::with_capacity(inputs.len());

        for (index, (input, slots)) in inputs.iter().zip(&program.input_slots).enumerate() {
            let core = slots.len();
            if input.ndim() < core {
                return Err(VectorizeError::MissingCoreDimensions {
                    index,
                    ndim: input.ndim(),
                    core,
                });
            }
            let (loops, core_shape) = input.shape().split_at(input.ndim() - core);

            for (&slot, &extent) in slots.iter().zip(core_shape) {
                match extents[slot] {
                    None => extents[slot] = Some(extent),
                    Some(first) if first != extent => {
                        return Err(VectorizeError::DimensionMismatch {
                            dim: program.dims[slot].clone(),
                            first,
                            second: extent,
                        });
                    }
                    Some(_) => {}
                }
            }

            if !loops.is_empty() {
                match loop_shape {
                    None => loop_shape = Some(loops),
                    Some(expected) if expected != loops => {
                        return Err(VectorizeError::LoopShapeMismatch {
                            index,
                            expected: expected.to_vec(),
                            got: loops.to_vec(),
                        });
                    }
                    Some(_) => {}
                }
            }

            core_sizes.push(element_count(core_shape).unwrap_or(0));
            broadcast.push(loops.is_empty());
            core_strides.push(row_major_strides(core_shape));
        }

        // Every signature dimension appears in some input.
        let extents: Vec<usize> = extents.into_iter().map(|e| e.unwrap_or(0)).collect();

        for (operand, slots) in &program.accesses {
            for (axis, (&slot, &declared)) in slots
                .iter()
                .zip(&program.input_slots[*operand])
                .enumerate()
            {
                if extents[slot] > extents[declared] {
                    return Err(VectorizeError::AccessOutOfBounds {
                        operand: *operand,
                        axis,
                        dim: program.dims[slot].clone(),
                        extent: extents[slot],
                        bound: extents[declared],
                    });
                }
            }
        }

        let loop_shape = loop_shape.unwrap_or(&[]);
        let output_core: Vec<usize> = program.output_slots.iter().map(|&s| extents[s]).collect();
        let output_shape: Vec<usize> = loop_shape.iter().chain(&output_core).copied().collect();
        if element_count(&output_shape).is_none() {
            return Err(VectorizeError::OutputTooLarge {
                shape: output_shape,
            });
        }
        // A factor can only overflow when the other one is empty.
        let loop_count = element_count(loop_shape).unwrap_or(0);
        let output_core_size = element_count(&output_core).unwrap_or(0);

        Ok((
            BoundCall {
                inputs,
                extents,
                loop_count,
                core_sizes,
                broadcast,
                core_strides,
                output_core_size,
            },
            output_shape,
        ))
    }
}

//! Multi-threaded CPU vectorizers using Rayon
//!
//! The output is split into chunks of at least `parallel_min_chunk`
//! elements, and rayon's global pool evaluates the chunks.

use super::{compile_scalar, eval_range, ElementwiseExecutor, Ufunc, Vectorizer};
use crate::compile::Kernel;
use crate::config::VectorizeConfig;
use crate::domain::{ScalarFunction, Strategy, VectorizerKind};
use crate::error::VectorizeError;
use rayon::prelude::*;
use std::sync::Arc;

/// Rayon chunked loop.
pub struct ParallelExecutor {
    kernel: Arc<dyn Kernel>,
    min_chunk: usize,
    workers: usize,
}

impl ParallelExecutor {
    pub fn new(kernel: Arc<dyn Kernel>, min_chunk: usize) -> Self {
        Self {
            kernel,
            min_chunk: min_chunk.max(1),
            workers: num_cpus::get().max(1),
        }
    }

    /// Chunk length for `len` elements: a few chunks per worker, never
    /// below the configured minimum.
    fn chunk_len(&self, len: usize) -> usize {
        let per_worker = len.div_ceil(self.workers * 4);
        per_worker.max(self.min_chunk)
    }
}

impl ElementwiseExecutor for ParallelExecutor {
    fn run(&self, args: &[&[f64]], len: usize) -> Result<Vec<f64>, VectorizeError> {
        let mut out = vec![0.0; len];
        let chunk = self.chunk_len(len);
        let kernel = self.kernel.as_ref();

        out.par_chunks_mut(chunk)
            .enumerate()
            .for_each(|(n, block)| {
                let start = n * chunk;
                eval_range(kernel, args, start..start + block.len(), block);
            });

        Ok(out)
    }
}

/// Bytecode strategy, parallel target.
pub struct ParallelVectorize {
    func: ScalarFunction,
    min_chunk: usize,
}

impl ParallelVectorize {
    pub fn new(func: ScalarFunction, config: &VectorizeConfig) -> Self {
        Self {
            func,
            min_chunk: config.parallel_min_chunk,
        }
    }
}

impl Vectorizer for ParallelVectorize {
    fn kind(&self) -> VectorizerKind {
        VectorizerKind::ParallelVectorize
    }

    fn function(&self) -> &ScalarFunction {
        &self.func
    }

    fn build_ufunc(&self) -> Result<Ufunc, VectorizeError> {
        let kernel = compile_scalar(&self.func, Strategy::Bytecode)?;
        Ok(Ufunc::new(
            &self.func,
            self.kind(),
            Box::new(ParallelExecutor::new(kernel, self.min_chunk)),
        ))
    }
}

/// AST strategy, parallel target.
pub struct ParallelAstVectorize {
    func: ScalarFunction,
    min_chunk: usize,
}

impl ParallelAstVectorize {
    pub fn new(func: ScalarFunction, config: &VectorizeConfig) -> Self {
        Self {
            func,
            min_chunk: config.parallel_min_chunk,
        }
    }
}

impl Vectorizer for ParallelAstVectorize {
    fn kind(&self) -> VectorizerKind {
        VectorizerKind::ParallelAstVectorize
    }

    fn function(&self) -> &ScalarFunction {
        &self.func
    }

    fn build_ufunc(&self) -> Result<Ufunc, VectorizeError> {
        let kernel = compile_scalar(&self.func, Strategy::Ast)?;
        Ok(Ufunc::new(
            &self.func,
            self.kind(),
            Box::new(ParallelExecutor::new(kernel, self.min_chunk)),
        ))
    }
}

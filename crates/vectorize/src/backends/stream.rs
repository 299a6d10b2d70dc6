//! Streaming CPU vectorizers
//!
//! Inputs are consumed in fixed-size chunks. Each chunk of every argument is
//! staged into a contiguous scratch buffer (broadcast arguments are expanded
//! once), then the kernel runs over the staged chunk. This keeps the working
//! set of long calls bounded by `stream_chunk_size * (arity + 1)` elements.

use super::{compile_scalar, eval_range, ElementwiseExecutor, Ufunc, Vectorizer};
use crate::compile::Kernel;
use crate::config::VectorizeConfig;
use crate::domain::{ScalarFunction, Strategy, VectorizerKind};
use crate::error::VectorizeError;
use std::sync::Arc;

pub struct StreamExecutor {
    kernel: Arc<dyn Kernel>,
    chunk_size: usize,
}

impl StreamExecutor {
    pub fn new(kernel: Arc<dyn Kernel>, chunk_size: usize) -> Self {
        Self {
            kernel,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl ElementwiseExecutor for StreamExecutor {
    fn run(&self, args: &[&[f64]], len: usize) -> Result<Vec<f64>, VectorizeError> {
        let mut out = vec![0.0; len];
        let mut staged: Vec<Vec<f64>> = args
            .iter()
            .map(|_| Vec::with_capacity(self.chunk_size.min(len)))
            .collect();

        let mut start = 0;
        while start < len {
            let end = (start + self.chunk_size).min(len);

            for (buffer, arg) in staged.iter_mut().zip(args) {
                buffer.clear();
                if arg.len() == 1 {
                    buffer.resize(end - start, arg[0]);
                } else {
                    buffer.extend_from_slice(&arg[start..end]);
                }
            }

            let views: Vec<&[f64]> = staged.iter().map(Vec::as_slice).collect();
            let range = 0..end - start;
            eval_range(self.kernel.as_ref(), &views, range, &mut out[start..end]);
            start = end;
        }

        Ok(out)
    }
}

/// Bytecode strategy, stream target.
pub struct StreamVectorize {
    func: ScalarFunction,
    chunk_size: usize,
}

impl StreamVectorize {
    pub fn new(func: ScalarFunction, config: &VectorizeConfig) -> Self {
        Self {
            func,
            chunk_size: config.stream_chunk_size,
        }
    }
}

impl Vectorizer for StreamVectorize {
    fn kind(&self) -> VectorizerKind {
        VectorizerKind::StreamVectorize
    }

    fn function(&self) -> &ScalarFunction {
        &self.func
    }

    fn build_ufunc(&self) -> Result<Ufunc, VectorizeError> {
        let kernel = compile_scalar(&self.func, Strategy::Bytecode)?;
        Ok(Ufunc::new(
            &self.func,
            self.kind(),
            Box::new(StreamExecutor::new(kernel, self.chunk_size)),
        ))
    }
}

/// AST strategy, stream target.
pub struct StreamAstVectorize {
    func: ScalarFunction,
    chunk_size: usize,
}

impl StreamAstVectorize {
    pub fn new(func: ScalarFunction, config: &VectorizeConfig) -> Self {
        Self {
            func,
            chunk_size: config.stream_chunk_size,
        }
    }
}

impl Vectorizer for StreamAstVectorize {
    fn kind(&self) -> VectorizerKind {
        VectorizerKind::StreamAstVectorize
    }

    fn function(&self) -> &ScalarFunction {
        &self.func
    }

    fn build_ufunc(&self) -> Result<Ufunc, VectorizeError> {
        let kernel = compile_scalar(&self.func, Strategy::Ast)?;
        Ok(Ufunc::new(
            &self.func,
            self.kind(),
            Box::new(StreamExecutor::new(kernel, self.chunk_size)),
        ))
    }
}

//! Minimal-strategy vectorizers
//!
//! The lowered tree is evaluated as-is, with no compile step beyond
//! lowering. Only cpu and parallel targets exist for this strategy.

use super::basic::SerialExecutor;
use super::parallel::ParallelExecutor;
use super::{compile_scalar, Ufunc, Vectorizer};
use crate::config::VectorizeConfig;
use crate::domain::{ScalarFunction, Strategy, VectorizerKind};
use crate::error::VectorizeError;

pub struct MiniVectorize {
    func: ScalarFunction,
}

impl MiniVectorize {
    pub fn new(func: ScalarFunction) -> Self {
        Self { func }
    }
}

impl Vectorizer for MiniVectorize {
    fn kind(&self) -> VectorizerKind {
        VectorizerKind::MiniVectorize
    }

    fn function(&self) -> &ScalarFunction {
        &self.func
    }

    fn build_ufunc(&self) -> Result<Ufunc, VectorizeError> {
        let kernel = compile_scalar(&self.func, Strategy::Mini)?;
        Ok(Ufunc::new(
            &self.func,
            self.kind(),
            Box::new(SerialExecutor::new(kernel)),
        ))
    }
}

pub struct ParallelMiniVectorize {
    func: ScalarFunction,
    min_chunk: usize,
}

impl ParallelMiniVectorize {
    pub fn new(func: ScalarFunction, config: &VectorizeConfig) -> Self {
        Self {
            func,
            min_chunk: config.parallel_min_chunk,
        }
    }
}

impl Vectorizer for ParallelMiniVectorize {
    fn kind(&self) -> VectorizerKind {
        VectorizerKind::ParallelMiniVectorize
    }

    fn function(&self) -> &ScalarFunction {
        &self.func
    }

    fn build_ufunc(&self) -> Result<Ufunc, VectorizeError> {
        let kernel = compile_scalar(&self.func, Strategy::Mini)?;
        Ok(Ufunc::new(
            &self.func,
            self.kind(),
            Box::new(ParallelExecutor::new(kernel, self.min_chunk)),
        ))
    }
}

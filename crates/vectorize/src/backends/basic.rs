//! Serial CPU vectorizers
//!
//! The reference target: one thread, one pass over the broadcast inputs.

use super::{compile_scalar, eval_range, ElementwiseExecutor, Ufunc, Vectorizer};
use crate::compile::Kernel;
use crate::domain::{ScalarFunction, Strategy, VectorizerKind};
use crate::error::VectorizeError;
use std::sync::Arc;

/// Single-threaded loop over all elements.
pub struct SerialExecutor {
    kernel: Arc<dyn Kernel>,
}

impl SerialExecutor {
    pub fn new(kernel: Arc<dyn Kernel>) -> Self {
        Self { kernel }
    }
}

impl ElementwiseExecutor for SerialExecutor {
    fn run(&self, args: &[&[f64]], len: usize) -> Result<Vec<f64>, VectorizeError> {
        let mut out = vec![0.0; len];
        eval_range(self.kernel.as_ref(), args, 0..len, &mut out);
        Ok(out)
    }
}

/// Bytecode strategy, cpu target.
pub struct BasicVectorize {
    func: ScalarFunction,
}

impl BasicVectorize {
    pub fn new(func: ScalarFunction) -> Self {
        Self { func }
    }
}

impl Vectorizer for BasicVectorize {
    fn kind(&self) -> VectorizerKind {
        VectorizerKind::BasicVectorize
    }

    fn function(&self) -> &ScalarFunction {
        &self.func
    }

    fn build_ufunc(&self) -> Result<Ufunc, VectorizeError> {
        let kernel = compile_scalar(&self.func, Strategy::Bytecode)?;
        Ok(Ufunc::new(
            &self.func,
            self.kind(),
            Box::new(SerialExecutor::new(kernel)),
        ))
    }
}

/// AST strategy, cpu target.
pub struct BasicAstVectorize {
    func: ScalarFunction,
}

impl BasicAstVectorize {
    pub fn new(func: ScalarFunction) -> Self {
        Self { func }
    }
}

impl Vectorizer for BasicAstVectorize {
    fn kind(&self) -> VectorizerKind {
        VectorizerKind::BasicAstVectorize
    }

    fn function(&self) -> &ScalarFunction {
        &self.func
    }

    fn build_ufunc(&self) -> Result<Ufunc, VectorizeError> {
        let kernel = compile_scalar(&self.func, Strategy::Ast)?;
        Ok(Ufunc::new(
            &self.func,
            self.kind(),
            Box::new(SerialExecutor::new(kernel)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Expr;

    fn saxpy() -> ScalarFunction {
        // a * x + y
        ScalarFunction::new("saxpy", 3, Expr::arg(0) * Expr::arg(1) + Expr::arg(2)).unwrap()
    }

    #[test]
    fn test_basic_vectorize_broadcasts_scalars() {
        let ufunc = BasicVectorize::new(saxpy()).build_ufunc().unwrap();
        let out = ufunc
            .call(&[&[2.0], &[1.0, 2.0, 3.0], &[10.0, 20.0, 30.0]])
            .unwrap();
        assert_eq!(out, vec![12.0, 24.0, 36.0]);
        assert_eq!(ufunc.kind(), VectorizerKind::BasicVectorize);
    }

    #[test]
    fn test_basic_ast_vectorize_matches_bytecode() {
        let x: Vec<f64> = (0..100).map(|i| i as f64 * 0.5).collect();
        let y: Vec<f64> = (0..100).map(|i| (i as f64).sin()).collect();
        let args: [&[f64]; 3] = [&[-1.5], &x, &y];

        let bytecode = BasicVectorize::new(saxpy()).build_ufunc().unwrap();
        let ast = BasicAstVectorize::new(saxpy()).build_ufunc().unwrap();
        assert_eq!(bytecode.call(&args).unwrap(), ast.call(&args).unwrap());
    }

    #[test]
    fn test_arity_is_checked() {
        let ufunc = BasicAstVectorize::new(saxpy()).build_ufunc().unwrap();
        assert!(matches!(
            ufunc.call(&[&[1.0], &[2.0]]),
            Err(VectorizeError::ArityMismatch {
                expected: 3,
                got: 2
            })
        ));
    }

    #[test]
    fn test_empty_inputs_produce_empty_output() {
        let ufunc = BasicVectorize::new(saxpy()).build_ufunc().unwrap();
        assert!(ufunc.call(&[&[1.0], &[], &[]]).unwrap().is_empty());
    }
}

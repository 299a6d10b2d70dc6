//! Generalized ufunc vectorizers (CPU)
//!
//! For each loop iteration the inputs' core blocks are viewed in place and
//! the kernel is evaluated once per element of the output core block.

use super::{BoundCall, GuExecutor, GuUfunc, GuVectorizer};
use crate::compile::lower::lower_gufunc;
use crate::compile::{compile, Env, Kernel, Operand};
use crate::domain::{GuFunction, GuSignature, Strategy, VectorizerKind};
use crate::error::VectorizeError;
use std::sync::Arc;

pub struct SerialGuExecutor {
    kernel: Arc<dyn Kernel>,
    output_slots: Vec<usize>,
}

impl SerialGuExecutor {
    pub fn new(kernel: Arc<dyn Kernel>, output_slots: Vec<usize>) -> Self {
        Self {
            kernel,
            output_slots,
        }
    }
}

impl GuExecutor for SerialGuExecutor {
    fn run(&self, call: &BoundCall<'_>) -> Result<Vec<f64>, VectorizeError> {
        let core = call.output_core_size;
        let mut out = vec![0.0; call.loop_count * core];
        let mut index = vec![0usize; call.extents.len()];

        let blocks = out.chunks_mut(core.max(1)).enumerate();
        for (l, block) in blocks.take(call.loop_count) {
            let operands: Vec<Operand<'_>> = (0..call.inputs.len())
                .map(|k| Operand {
                    data: call.core_block(k, l),
                    strides: &call.core_strides[k],
                })
                .collect();

            for (j, slot) in block.iter_mut().enumerate().take(core) {
                // Decode j into the output core index, last axis fastest.
                let mut rest = j;
                for &s in self.output_slots.iter().rev() {
                    let extent = call.extents[s];
                    index[s] = rest % extent;
                    rest /= extent;
                }
                let mut env = Env {
                    args: &[],
                    operands: &operands,
                    extents: &call.extents,
                    index: &mut index,
                };
                *slot = self.kernel.eval(&mut env);
            }
        }

        Ok(out)
    }
}

fn build(
    func: &GuFunction,
    signature: &GuSignature,
    strategy: Strategy,
    kind: VectorizerKind,
) -> Result<GuUfunc, VectorizeError> {
    let program = lower_gufunc(func, signature)?;
    let kernel = compile(strategy, &program);
    let executor = SerialGuExecutor::new(kernel, program.output_slots.clone());
    Ok(GuUfunc::new(func, signature, kind, program, Box::new(executor)))
}

/// Bytecode strategy, cpu target.
pub struct GuFuncVectorize {
    func: GuFunction,
    signature: GuSignature,
}

impl GuFuncVectorize {
    pub fn new(func: GuFunction, signature: GuSignature) -> Self {
        Self { func, signature }
    }
}

impl GuVectorizer for GuFuncVectorize {
    fn kind(&self) -> VectorizerKind {
        VectorizerKind::GuFuncVectorize
    }

    fn function(&self) -> &GuFunction {
        &self.func
    }

    fn signature(&self) -> &GuSignature {
        &self.signature
    }

    fn build_ufunc(&self) -> Result<GuUfunc, VectorizeError> {
        build(&self.func, &self.signature, Strategy::Bytecode, self.kind())
    }
}

/// AST strategy, cpu target.
pub struct GuFuncAstVectorize {
    func: GuFunction,
    signature: GuSignature,
}

impl GuFuncAstVectorize {
    pub fn new(func: GuFunction, signature: GuSignature) -> Self {
        Self { func, signature }
    }
}

impl GuVectorizer for GuFuncAstVectorize {
    fn kind(&self) -> VectorizerKind {
        VectorizerKind::GuFuncAstVectorize
    }

    fn function(&self) -> &GuFunction {
        &self.func
    }

    fn signature(&self) -> &GuSignature {
        &self.signature
    }

    fn build_ufunc(&self) -> Result<GuUfunc, VectorizeError> {
        build(&self.func, &self.signature, Strategy::Ast, self.kind())
    }
}

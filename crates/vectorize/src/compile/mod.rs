//! Compile strategies
//!
//! Every strategy consumes the same lowered [`Program`](lower::Program) and
//! produces a [`Kernel`] that evaluates one output element against an
//! [`Env`]:
//!
//! - `bytecode`: stack program, interpreted
//! - `ast`: nested closures built once per ufunc
//! - `mini`: direct walk over the lowered tree

pub mod ast;
pub mod bytecode;
pub mod lower;
pub mod mini;

use crate::domain::Strategy;
use lower::Program;
use std::sync::Arc;

/// Core block of one gufunc input, viewed through row-major strides.
#[derive(Debug, Clone, Copy)]
pub struct Operand<'a> {
    pub data: &'a [f64],
    pub strides: &'a [usize],
}

/// Evaluation state for a single output element.
pub struct Env<'a> {
    /// Scalar arguments of an elementwise call
    pub args: &'a [f64],
    /// Input core blocks of a gufunc call
    pub operands: &'a [Operand<'a>],
    /// Extent of every dimension slot
    pub extents: &'a [usize],
    /// Current index of every dimension slot
    pub index: &'a mut [usize],
}

impl<'a> Env<'a> {
    pub fn scalar(args: &'a [f64]) -> Self {
        Self {
            args,
            operands: &[],
            extents: &[],
            index: &mut [],
        }
    }

    #[inline]
    pub fn load(&self, operand: usize, slots: &[usize]) -> f64 {
        let view = &self.operands[operand];
        let offset: usize = slots
            .iter()
            .zip(view.strides)
            .map(|(slot, stride)| self.index[*slot] * stride)
            .sum();
        view.data[offset]
    }
}

/// A compiled kernel.
pub trait Kernel: Send + Sync {
    fn eval(&self, env: &mut Env<'_>) -> f64;
}

/// Compile a lowered program with the given strategy.
pub fn compile(strategy: Strategy, program: &Program) -> Arc<dyn Kernel> {
    match strategy {
        Strategy::Bytecode => Arc::new(bytecode::BytecodeKernel::compile(program)),
        Strategy::Ast => Arc::new(ast::AstKernel::compile(program)),
        Strategy::Mini => Arc::new(mini::MiniKernel::new(program)),
    }
}

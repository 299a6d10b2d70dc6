//! Bytecode strategy: compile to a stack program and interpret it
//!
//! Operands are pushed in evaluation order; every operator pops its inputs
//! and pushes one result. `Select` is branch-free (both arms are evaluated)
//! since kernels are pure. A reduction carries its body as a nested program.

use super::lower::{Node, Program};
use super::{Env, Kernel};
use crate::domain::{BinaryOp, UnaryOp};

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Push(f64),
    Arg(usize),
    Load { operand: usize, slots: Box<[usize]> },
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// Pops otherwise, then, cond
    Select,
    Sum { slot: usize, body: Box<[Op]> },
}

pub struct BytecodeKernel {
    code: Box<[Op]>,
    max_depth: usize,
}

impl BytecodeKernel {
    pub fn compile(program: &Program) -> Self {
        let mut code = Vec::new();
        emit(&program.root, &mut code);
        let max_depth = stack_depth(&code);
        Self {
            code: code.into_boxed_slice(),
            max_depth,
        }
    }

    pub fn code(&self) -> &[Op] {
        &self.code
    }
}

impl Kernel for BytecodeKernel {
    fn eval(&self, env: &mut Env<'_>) -> f64 {
        let mut stack = Vec::with_capacity(self.max_depth);
        run(&self.code, env, &mut stack)
    }
}

fn emit(node: &Node, code: &mut Vec<Op>) {
    match node {
        Node::Const(v) => code.push(Op::Push(*v)),
        Node::Arg(i) => code.push(Op::Arg(*i)),
        Node::Unary(op, operand) => {
            emit(operand, code);
            code.push(Op::Unary(*op));
        }
        Node::Binary(op, lhs, rhs) => {
            emit(lhs, code);
            emit(rhs, code);
            code.push(Op::Binary(*op));
        }
        Node::Select(cond, then, otherwise) => {
            emit(cond, code);
            emit(then, code);
            emit(otherwise, code);
            code.push(Op::Select);
        }
        Node::Load { operand, slots } => code.push(Op::Load {
            operand: *operand,
            slots: slots.clone().into_boxed_slice(),
        }),
        Node::Sum { slot, body } => {
            let mut inner = Vec::new();
            emit(body, &mut inner);
            code.push(Op::Sum {
                slot: *slot,
                body: inner.into_boxed_slice(),
            });
        }
    }
}

/// Peak stack height, nested reduction bodies included.
fn stack_depth(code: &[Op]) -> usize {
    let mut depth = 0usize;
    let mut peak = 0usize;
    for op in code {
        match op {
            Op::Push(_) | Op::Arg(_) | Op::Load { .. } => depth += 1,
            Op::Unary(_) => {}
            Op::Binary(_) => depth -= 1,
            Op::Select => depth -= 2,
            Op::Sum { body, .. } => {
                peak = peak.max(depth + stack_depth(body));
                depth += 1;
            }
        }
        peak = peak.max(depth);
    }
    peak
}

fn run(code: &[Op], env: &mut Env<'_>, stack: &mut Vec<f64>) -> f64 {
    let base = stack.len();
    for op in code {
        match op {
            Op::Push(v) => stack.push(*v),
            Op::Arg(i) => stack.push(env.args[*i]),
            Op::Load { operand, slots } => stack.push(env.load(*operand, slots)),
            Op::Unary(op) => {
                let x = pop(stack);
                stack.push(op.apply(x));
            }
            Op::Binary(op) => {
                let b = pop(stack);
                let a = pop(stack);
                stack.push(op.apply(a, b));
            }
            Op::Select => {
                let otherwise = pop(stack);
                let then = pop(stack);
                let cond = pop(stack);
                stack.push(if cond != 0.0 { then } else { otherwise });
            }
            Op::Sum { slot, body } => {
                let saved = env.index[*slot];
                let mut total = 0.0;
                for i in 0..env.extents[*slot] {
                    env.index[*slot] = i;
                    total += run(body, env, stack);
                }
                env.index[*slot] = saved;
                stack.push(total);
            }
        }
    }
    let result = pop(stack);
    debug_assert_eq!(stack.len(), base);
    result
}

// Programs produced by `emit` are balanced; an empty stack here is a compiler bug.
#[inline]
fn pop(stack: &mut Vec<f64>) -> f64 {
    stack.pop().unwrap_or(f64::NAN)
}

//! AST strategy: compile the tree into nested closures
//!
//! Dispatch on node type happens once, at compile time. Evaluation is a chain
//! of indirect calls with operator and slot constants already captured.

use super::lower::{Node, Program};
use super::{Env, Kernel};

type Closure = Box<dyn Fn(&mut Env<'_>) -> f64 + Send + Sync>;

pub struct AstKernel {
    root: Closure,
}

impl AstKernel {
    pub fn compile(program: &Program) -> Self {
        Self {
            root: compile_node(&program.root),
        }
    }
}

impl Kernel for AstKernel {
    fn eval(&self, env: &mut Env<'_>) -> f64 {
        (self.root)(env)
    }
}

fn compile_node(node: &Node) -> Closure {
    match node {
        Node::Const(v) => {
            let v = *v;
            Box::new(move |_: &mut Env<'_>| v)
        }
        Node::Arg(i) => {
            let i = *i;
            Box::new(move |env: &mut Env<'_>| env.args[i])
        }
        Node::Unary(op, operand) => {
            let op = *op;
            let operand = compile_node(operand);
            Box::new(move |env: &mut Env<'_>| op.apply(operand(env)))
        }
        Node::Binary(op, lhs, rhs) => {
            let op = *op;
            let lhs = compile_node(lhs);
            let rhs = compile_node(rhs);
            Box::new(move |env: &mut Env<'_>| {
                let a = lhs(env);
                let b = rhs(env);
                op.apply(a, b)
            })
        }
        Node::Select(cond, then, otherwise) => {
            let cond = compile_node(cond);
            let then = compile_node(then);
            let otherwise = compile_node(otherwise);
            Box::new(move |env: &mut Env<'_>| {
                if cond(env) != 0.0 {
                    then(env)
                } else {
                    otherwise(env)
                }
            })
        }
        Node::Load { operand, slots } => {
            let operand = *operand;
            let slots = slots.clone();
            Box::new(move |env: &mut Env<'_>| env.load(operand, &slots))
        }
        Node::Sum { slot, body } => {
            let slot = *slot;
            let body = compile_node(body);
            Box::new(move |env: &mut Env<'_>| {
                let saved = env.index[slot];
                let mut total = 0.0;
                for i in 0..env.extents[slot] {
                    env.index[slot] = i;
                    total += body(env);
                }
                env.index[slot] = saved;
                total
            })
        }
    }
}

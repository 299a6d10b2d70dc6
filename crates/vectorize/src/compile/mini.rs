//! Minimal strategy: evaluate the lowered tree directly

use super::lower::{Node, Program};
use super::{Env, Kernel};

pub struct MiniKernel {
    root: Node,
}

impl MiniKernel {
    pub fn new(program: &Program) -> Self {
        Self {
            root: program.root.clone(),
        }
    }
}

impl Kernel for MiniKernel {
    fn eval(&self, env: &mut Env<'_>) -> f64 {
        eval_node(&self.root, env)
    }
}

fn eval_node(node: &Node, env: &mut Env<'_>) -> f64 {
    match node {
        Node::Const(v) => *v,
        Node::Arg(i) => env.args[*i],
        Node::Unary(op, operand) => op.apply(eval_node(operand, env)),
        Node::Binary(op, lhs, rhs) => {
            let a = eval_node(lhs, env);
            let b = eval_node(rhs, env);
            op.apply(a, b)
        }
        Node::Select(cond, then, otherwise) => {
            if eval_node(cond, env) != 0.0 {
                eval_node(then, env)
            } else {
                eval_node(otherwise, env)
            }
        }
        Node::Load { operand, slots } => env.load(*operand, slots),
        Node::Sum { slot, body } => {
            let saved = env.index[*slot];
            let mut total = 0.0;
            for i in 0..env.extents[*slot] {
                env.index[*slot] = i;
                total += eval_node(body, env);
            }
            env.index[*slot] = saved;
            total
        }
    }
}

//! Kernel expression language
//!
//! Functions handed to the registry are written as pure `f64` expressions.
//! A [`ScalarFunction`] maps `arity` scalars to one scalar and is used by the
//! elementwise vectorizers. A [`GuFunction`] computes one element of a
//! generalized ufunc output from core blocks of its inputs, addressed by the
//! dimension names of a [`GuSignature`](super::GuSignature).
//!
//! # Example
//!
//! ```
//! use vectorize::{Expr, ScalarFunction};
//!
//! // hypot(x, y) = sqrt(x*x + y*y)
//! let x = Expr::arg(0);
//! let y = Expr::arg(1);
//! let hypot = ScalarFunction::new("hypot", 2, (x.clone() * x + y.clone() * y).sqrt()).unwrap();
//! assert_eq!(hypot.arity(), 2);
//! ```

use crate::error::KernelError;
use std::ops;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Abs,
    Sqrt,
    Exp,
    Ln,
    Sin,
    Cos,
    Tanh,
    Floor,
}

impl UnaryOp {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            UnaryOp::Neg => -x,
            UnaryOp::Abs => x.abs(),
            UnaryOp::Sqrt => x.sqrt(),
            UnaryOp::Exp => x.exp(),
            UnaryOp::Ln => x.ln(),
            UnaryOp::Sin => x.sin(),
            UnaryOp::Cos => x.cos(),
            UnaryOp::Tanh => x.tanh(),
            UnaryOp::Floor => x.floor(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Min,
    Max,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl BinaryOp {
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Pow => a.powf(b),
            BinaryOp::Min => a.min(b),
            BinaryOp::Max => a.max(b),
            BinaryOp::Lt => truth(a < b),
            BinaryOp::Le => truth(a <= b),
            BinaryOp::Gt => truth(a > b),
            BinaryOp::Ge => truth(a >= b),
            BinaryOp::Eq => truth(a == b),
        }
    }
}

#[inline]
fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Expression tree of a kernel body.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(f64),
    /// Scalar argument by position
    Arg(usize),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `then` when `cond != 0.0`, else `otherwise`
    Select {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Element of an input core block (gufunc kernels only)
    Element { operand: usize, index: Vec<String> },
    /// Sum of `body` over a core dimension (gufunc kernels only)
    Sum { dim: String, body: Box<Expr> },
}

impl Expr {
    pub fn constant(value: f64) -> Self {
        Expr::Const(value)
    }

    pub fn arg(index: usize) -> Self {
        Expr::Arg(index)
    }

    /// Element of input `operand` at the given core dimension names.
    pub fn element<S: Into<String>>(operand: usize, index: impl IntoIterator<Item = S>) -> Self {
        Expr::Element {
            operand,
            index: index.into_iter().map(Into::into).collect(),
        }
    }

    pub fn sum(dim: impl Into<String>, body: Expr) -> Self {
        Expr::Sum {
            dim: dim.into(),
            body: Box::new(body),
        }
    }

    pub fn select(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Select {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary(op, Box::new(operand))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn abs(self) -> Self {
        Expr::unary(UnaryOp::Abs, self)
    }

    pub fn sqrt(self) -> Self {
        Expr::unary(UnaryOp::Sqrt, self)
    }

    pub fn exp(self) -> Self {
        Expr::unary(UnaryOp::Exp, self)
    }

    pub fn ln(self) -> Self {
        Expr::unary(UnaryOp::Ln, self)
    }

    pub fn sin(self) -> Self {
        Expr::unary(UnaryOp::Sin, self)
    }

    pub fn cos(self) -> Self {
        Expr::unary(UnaryOp::Cos, self)
    }

    pub fn tanh(self) -> Self {
        Expr::unary(UnaryOp::Tanh, self)
    }

    pub fn floor(self) -> Self {
        Expr::unary(UnaryOp::Floor, self)
    }

    pub fn pow(self, exponent: Expr) -> Self {
        Expr::binary(BinaryOp::Pow, self, exponent)
    }

    pub fn min(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Min, self, other)
    }

    pub fn max(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Max, self, other)
    }

    pub fn lt(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Lt, self, other)
    }

    pub fn le(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Le, self, other)
    }

    pub fn gt(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Gt, self, other)
    }

    pub fn ge(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Ge, self, other)
    }

    pub fn equals(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Eq, self, other)
    }

    /// Visits every node in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Const(_) | Expr::Arg(_) | Expr::Element { .. } => {}
            Expr::Unary(_, operand) => operand.walk(visit),
            Expr::Binary(_, lhs, rhs) => {
                lhs.walk(visit);
                rhs.walk(visit);
            }
            Expr::Select {
                cond,
                then,
                otherwise,
            } => {
                cond.walk(visit);
                then.walk(visit);
                otherwise.walk(visit);
            }
            Expr::Sum { body, .. } => body.walk(visit),
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Const(value)
    }
}

macro_rules! impl_binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<Expr>> ops::$trait<R> for Expr {
            type Output = Expr;

            fn $method(self, rhs: R) -> Expr {
                Expr::binary($op, self, rhs.into())
            }
        }
    };
}

impl_binary_operator!(Add, add, BinaryOp::Add);
impl_binary_operator!(Sub, sub, BinaryOp::Sub);
impl_binary_operator!(Mul, mul, BinaryOp::Mul);
impl_binary_operator!(Div, div, BinaryOp::Div);

impl ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::unary(UnaryOp::Neg, self)
    }
}

/// A scalar function of fixed arity, the input of the elementwise vectorizers.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarFunction {
    name: String,
    arity: usize,
    body: Expr,
}

impl ScalarFunction {
    /// Create a function, rejecting out-of-range arguments and gufunc-only nodes.
    pub fn new(name: impl Into<String>, arity: usize, body: Expr) -> Result<Self, KernelError> {
        let mut error = None;
        body.walk(&mut |node| {
            if error.is_some() {
                return;
            }
            error = match node {
                Expr::Arg(index) if *index >= arity => Some(KernelError::ArgumentOutOfRange {
                    index: *index,
                    arity,
                }),
                Expr::Element { .. } => Some(KernelError::GuOnlyNode { node: "element" }),
                Expr::Sum { .. } => Some(KernelError::GuOnlyNode { node: "sum" }),
                _ => None,
            };
        });
        match error {
            Some(err) => Err(err),
            None => Ok(Self {
                name: name.into(),
                arity,
                body,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }
}

/// Body of a generalized ufunc: computes one element of the output core
/// block. Checked against its signature when the ufunc is built.
#[derive(Debug, Clone, PartialEq)]
pub struct GuFunction {
    name: String,
    body: Expr,
}

impl GuFunction {
    pub fn new(name: impl Into<String>, body: Expr) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }
}

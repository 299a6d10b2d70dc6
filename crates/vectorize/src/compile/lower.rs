//! Lowering from the kernel language to slot-resolved IR
//!
//! Dimension names are replaced by slot indices into the per-call extent and
//! index tables. All kernel validation happens here, so the strategies can
//! assume well-formed input.

use crate::domain::{BinaryOp, Expr, GuFunction, GuSignature, ScalarFunction, UnaryOp};
use crate::error::KernelError;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Const(f64),
    Arg(usize),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Select(Box<Node>, Box<Node>, Box<Node>),
    /// Read `operand` at the current index of each slot
    Load { operand: usize, slots: Vec<usize> },
    /// Sum `body` over `0..extent[slot]`
    Sum { slot: usize, body: Box<Node> },
}

/// A lowered kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub root: Node,
    /// Scalar arguments (elementwise kernels)
    pub arity: usize,
    /// Dimension names by slot (gufunc kernels)
    pub dims: Vec<String>,
    /// Declared core slots of each input
    pub input_slots: Vec<Vec<usize>>,
    /// Core slots of the output
    pub output_slots: Vec<usize>,
    /// Every element access, for bounds checks against bound extents
    pub accesses: Vec<(usize, Vec<usize>)>,
}

impl Program {
    /// Number of dimension slots.
    pub fn slot_count(&self) -> usize {
        self.dims.len()
    }
}

pub fn lower_scalar(func: &ScalarFunction) -> Result<Program, KernelError> {
    Ok(Program {
        root: lower_scalar_expr(func.body())?,
        arity: func.arity(),
        dims: Vec::new(),
        input_slots: Vec::new(),
        output_slots: Vec::new(),
        accesses: Vec::new(),
    })
}

fn lower_scalar_expr(expr: &Expr) -> Result<Node, KernelError> {
    Ok(match expr {
        Expr::Const(v) => Node::Const(*v),
        Expr::Arg(i) => Node::Arg(*i),
        Expr::Unary(op, operand) => Node::Unary(*op, Box::new(lower_scalar_expr(operand)?)),
        Expr::Binary(op, lhs, rhs) => Node::Binary(
            *op,
            Box::new(lower_scalar_expr(lhs)?),
            Box::new(lower_scalar_expr(rhs)?),
        ),
        Expr::Select {
            cond,
            then,
            otherwise,
        } => Node::Select(
            Box::new(lower_scalar_expr(cond)?),
            Box::new(lower_scalar_expr(then)?),
            Box::new(lower_scalar_expr(otherwise)?),
        ),
        Expr::Element { .. } => return Err(KernelError::GuOnlyNode { node: "element" }),
        Expr::Sum { .. } => return Err(KernelError::GuOnlyNode { node: "sum" }),
    })
}

pub fn lower_gufunc(func: &GuFunction, signature: &GuSignature) -> Result<Program, KernelError> {
    let dims = signature.dimensions();
    let slot_of = |name: &str| -> Result<usize, KernelError> {
        dims.iter()
            .position(|dim| dim == name)
            .ok_or_else(|| KernelError::UnknownDimension(name.to_string()))
    };

    let input_slots = signature
        .inputs()
        .iter()
        .map(|group| group.iter().map(|name| slot_of(name)).collect())
        .collect::<Result<Vec<Vec<usize>>, _>>()?;
    let output_slots = signature
        .output()
        .iter()
        .map(|name| slot_of(name))
        .collect::<Result<Vec<usize>, _>>()?;

    let mut lowering = GuLowering {
        slot_of: &slot_of,
        input_slots: &input_slots,
        bound: output_slots.clone(),
        accesses: Vec::new(),
    };
    let root = lowering.lower(func.body())?;
    let accesses = lowering.accesses;

    Ok(Program {
        root,
        arity: 0,
        dims,
        input_slots,
        output_slots,
        accesses,
    })
}

struct GuLowering<'a, F> {
    slot_of: &'a F,
    input_slots: &'a [Vec<usize>],
    /// Slots bound by the output index or an enclosing sum
    bound: Vec<usize>,
    accesses: Vec<(usize, Vec<usize>)>,
}

impl<F> GuLowering<'_, F>
where
    F: Fn(&str) -> Result<usize, KernelError>,
{
    fn lower(&mut self, expr: &Expr) -> Result<Node, KernelError> {
        Ok(match expr {
            Expr::Const(v) => Node::Const(*v),
            Expr::Arg(_) => return Err(KernelError::ScalarArgInGuKernel),
            Expr::Unary(op, operand) => Node::Unary(*op, Box::new(self.lower(operand)?)),
            Expr::Binary(op, lhs, rhs) => {
                Node::Binary(*op, Box::new(self.lower(lhs)?), Box::new(self.lower(rhs)?))
            }
            Expr::Select {
                cond,
                then,
                otherwise,
            } => Node::Select(
                Box::new(self.lower(cond)?),
                Box::new(self.lower(then)?),
                Box::new(self.lower(otherwise)?),
            ),
            Expr::Element { operand, index } => {
                let Some(declared) = self.input_slots.get(*operand) else {
                    return Err(KernelError::OperandOutOfRange {
                        operand: *operand,
                        inputs: self.input_slots.len(),
                    });
                };
                if declared.len() != index.len() {
                    return Err(KernelError::IndexRankMismatch {
                        operand: *operand,
                        expected: declared.len(),
                        got: index.len(),
                    });
                }
                let mut slots = Vec::with_capacity(index.len());
                for name in index {
                    let slot = (self.slot_of)(name)?;
                    if !self.bound.contains(&slot) {
                        return Err(KernelError::UnboundDimension(name.clone()));
                    }
                    slots.push(slot);
                }
                self.accesses.push((*operand, slots.clone()));
                Node::Load {
                    operand: *operand,
                    slots,
                }
            }
            Expr::Sum { dim, body } => {
                let slot = (self.slot_of)(dim)?;
                self.bound.push(slot);
                let body = self.lower(body);
                self.bound.pop();
                Node::Sum {
                    slot,
                    body: Box::new(body?),
                }
            }
        })
    }
}

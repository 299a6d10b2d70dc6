//! OpenCL C generation from lowered kernels
//!
//! Kernels are specialised per call layout: broadcast flags, core extents and
//! strides are baked in as constants, so the generated source doubles as the
//! program cache key.
//!
//! Every kernel has the parameter list
//! `(__global const double* in0, ..., __global double* out, const ulong n)`
//! and computes `out[gid]` for `gid < n`.

use crate::backends::BoundCall;
use crate::compile::lower::{Node, Program};
use crate::domain::{BinaryOp, UnaryOp};
use std::fmt::Write;

const PRELUDE: &str = "#pragma OPENCL EXTENSION cl_khr_fp64 : enable\n\n";

/// Turn a function name into a valid OpenCL identifier.
pub fn kernel_name(name: &str) -> String {
    let mut ident = String::from("vec_");
    for c in name.chars() {
        ident.push(if c.is_ascii_alphanumeric() { c } else { '_' });
    }
    ident
}

/// Elementwise kernel; `broadcast[k]` marks length-1 arguments.
pub fn scalar_kernel(name: &str, program: &Program, broadcast: &[bool]) -> String {
    let mut src = String::from(PRELUDE);
    let _ = writeln!(src, "__kernel void {}(", name);
    for k in 0..program.arity {
        let _ = writeln!(src, "    __global const double* a{},", k);
    }
    src.push_str("    __global double* out,\n    const ulong n)\n{\n");
    src.push_str("    const ulong gid = get_global_id(0);\n    if (gid >= n) return;\n");
    for (k, is_broadcast) in broadcast.iter().enumerate() {
        let index = if *is_broadcast { "0" } else { "gid" };
        let _ = writeln!(src, "    const double x{} = a{}[{}];", k, k, index);
    }

    let mut emitter = Emitter::new(&[]);
    let value = emitter.expr(&program.root);
    src.push_str(&indent(&emitter.stmts, 1));
    let _ = writeln!(src, "    out[gid] = {};\n}}", value);
    src
}

/// Generalized ufunc kernel for one bound call: one work item per output
/// element, `n = loop_count * output_core_size`.
pub fn gufunc_kernel(name: &str, program: &Program, call: &BoundCall<'_>) -> String {
    let mut src = String::from(PRELUDE);
    let _ = writeln!(src, "__kernel void {}(", name);
    for k in 0..program.input_slots.len() {
        let _ = writeln!(src, "    __global const double* in{},", k);
    }
    src.push_str("    __global double* out,\n    const ulong n)\n{\n");
    src.push_str("    const ulong gid = get_global_id(0);\n    if (gid >= n) return;\n");

    let core = call.output_core_size.max(1);
    let _ = writeln!(src, "    const ulong l = gid / {}UL;", core);
    let _ = writeln!(src, "    ulong rest = gid % {}UL;", core);
    for &slot in program.output_slots.iter().rev() {
        let extent = call.extents[slot];
        let _ = writeln!(src, "    const ulong i{} = rest % {}UL;", slot, extent);
        let _ = writeln!(src, "    rest /= {}UL;", extent);
    }
    for k in 0..program.input_slots.len() {
        if call.broadcast[k] {
            let _ = writeln!(src, "    const ulong base{} = 0;", k);
        } else {
            let size = call.core_sizes[k];
            let _ = writeln!(src, "    const ulong base{} = l * {}UL;", k, size);
        }
    }

    let mut emitter = Emitter::new(&call.extents);
    emitter.strides = call.core_strides.clone();
    let value = emitter.expr(&program.root);
    src.push_str(&indent(&emitter.stmts, 1));
    let _ = writeln!(src, "    out[gid] = {};\n}}", value);
    src
}

fn indent(stmts: &str, level: usize) -> String {
    let pad = "    ".repeat(level);
    stmts
        .lines()
        .map(|line| format!("{}{}\n", pad, line))
        .collect()
}

fn literal(v: f64) -> String {
    if v.is_nan() {
        "NAN".to_string()
    } else if v == f64::INFINITY {
        "INFINITY".to_string()
    } else if v == f64::NEG_INFINITY {
        "(-INFINITY)".to_string()
    } else {
        format!("({:e})", v)
    }
}

struct Emitter<'a> {
    extents: &'a [usize],
    strides: Vec<Vec<usize>>,
    stmts: String,
    next_acc: usize,
}

impl<'a> Emitter<'a> {
    fn new(extents: &'a [usize]) -> Self {
        Self {
            extents,
            strides: Vec::new(),
            stmts: String::new(),
            next_acc: 0,
        }
    }

    fn expr(&mut self, node: &Node) -> String {
        match node {
            Node::Const(v) => literal(*v),
            Node::Arg(i) => format!("x{}", i),
            Node::Unary(op, operand) => {
                let x = self.expr(operand);
                match op {
                    UnaryOp::Neg => format!("(-{})", x),
                    UnaryOp::Abs => format!("fabs({})", x),
                    UnaryOp::Sqrt => format!("sqrt({})", x),
                    UnaryOp::Exp => format!("exp({})", x),
                    UnaryOp::Ln => format!("log({})", x),
                    UnaryOp::Sin => format!("sin({})", x),
                    UnaryOp::Cos => format!("cos({})", x),
                    UnaryOp::Tanh => format!("tanh({})", x),
                    UnaryOp::Floor => format!("floor({})", x),
                }
            }
            Node::Binary(op, lhs, rhs) => {
                let a = self.expr(lhs);
                let b = self.expr(rhs);
                match op {
                    BinaryOp::Add => format!("({} + {})", a, b),
                    BinaryOp::Sub => format!("({} - {})", a, b),
                    BinaryOp::Mul => format!("({} * {})", a, b),
                    BinaryOp::Div => format!("({} / {})", a, b),
                    BinaryOp::Pow => format!("pow({}, {})", a, b),
                    BinaryOp::Min => format!("fmin({}, {})", a, b),
                    BinaryOp::Max => format!("fmax({}, {})", a, b),
                    BinaryOp::Lt => format!("({} < {} ? 1.0 : 0.0)", a, b),
                    BinaryOp::Le => format!("({} <= {} ? 1.0 : 0.0)", a, b),
                    BinaryOp::Gt => format!("({} > {} ? 1.0 : 0.0)", a, b),
                    BinaryOp::Ge => format!("({} >= {} ? 1.0 : 0.0)", a, b),
                    BinaryOp::Eq => format!("({} == {} ? 1.0 : 0.0)", a, b),
                }
            }
            Node::Select(cond, then, otherwise) => {
                let c = self.expr(cond);
                let t = self.expr(then);
                let o = self.expr(otherwise);
                format!("({} != 0.0 ? {} : {})", c, t, o)
            }
            Node::Load { operand, slots } => {
                let mut offset = format!("base{}", operand);
                for (slot, stride) in slots.iter().zip(&self.strides[*operand]) {
                    let _ = write!(offset, " + i{} * {}UL", slot, stride);
                }
                format!("in{}[{}]", operand, offset)
            }
            Node::Sum { slot, body } => {
                let acc = format!("acc{}", self.next_acc);
                self.next_acc += 1;

                // Body statements belong inside the loop.
                let outer = std::mem::take(&mut self.stmts);
                let value = self.expr(body);
                let inner = std::mem::replace(&mut self.stmts, outer);

                let _ = writeln!(self.stmts, "double {} = 0.0;", acc);
                let (i, extent) = (slot, self.extents[*slot]);
                let _ = writeln!(
                    self.stmts,
                    "for (ulong i{i} = 0; i{i} < {extent}UL; ++i{i}) {{"
                );
                self.stmts.push_str(&indent(&inner, 1));
                let _ = writeln!(self.stmts, "    {} += {};", acc, value);
                self.stmts.push_str("}\n");
                acc
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::lower::{lower_gufunc, lower_scalar};
    use crate::domain::{Expr, GuFunction, GuSignature, NdArray, ScalarFunction};

    #[test]
    fn test_kernel_name_is_sanitised() {
        assert_eq!(kernel_name("soft-plus v2"), "vec_soft_plus_v2");
    }

    #[test]
    fn test_scalar_kernel_source() {
        let func = ScalarFunction::new("axpy", 2, Expr::arg(0) * 2.0 + Expr::arg(1)).unwrap();
        let program = lower_scalar(&func).unwrap();
        let src = scalar_kernel("vec_axpy", &program, &[true, false]);

        assert!(src.starts_with("#pragma OPENCL EXTENSION cl_khr_fp64 : enable"));
        assert!(src.contains("__kernel void vec_axpy("));
        assert!(src.contains("const double x0 = a0[0];"));
        assert!(src.contains("const double x1 = a1[gid];"));
        assert!(src.contains("out[gid] = ((x0 * (2e0)) + x1);"));
    }

    #[test]
    fn test_literals() {
        assert_eq!(literal(0.5), "(5e-1)");
        assert_eq!(literal(-3.0), "(-3e0)");
        assert_eq!(literal(f64::NEG_INFINITY), "(-INFINITY)");
        assert_eq!(literal(f64::NAN), "NAN");
    }

    #[test]
    fn test_gufunc_kernel_emits_reduction_loop() {
        let body = Expr::sum(
            "n",
            Expr::element(0, ["m", "n"]) * Expr::element(1, ["n", "p"]),
        );
        let func = GuFunction::new("matmul", body);
        let sig = GuSignature::parse("(m,n),(n,p)->(m,p)").unwrap();
        let program = lower_gufunc(&func, &sig).unwrap();

        let inputs = [
            NdArray::new(vec![4, 2, 3], vec![0.0; 24]).unwrap(),
            NdArray::new(vec![3, 5], vec![0.0; 15]).unwrap(),
        ];
        let call = BoundCall {
            inputs: &inputs,
            extents: vec![2, 3, 5],
            loop_count: 4,
            core_sizes: vec![6, 15],
            broadcast: vec![false, true],
            core_strides: vec![vec![3, 1], vec![5, 1]],
            output_core_size: 10,
        };
        let src = gufunc_kernel("vec_matmul", &program, &call);

        assert!(src.contains("const ulong l = gid / 10UL;"));
        assert!(src.contains("const ulong i2 = rest % 5UL;"));
        assert!(src.contains("const ulong i0 = rest % 2UL;"));
        assert!(src.contains("const ulong base0 = l * 6UL;"));
        assert!(src.contains("const ulong base1 = 0;"));
        assert!(src.contains("for (ulong i1 = 0; i1 < 3UL; ++i1) {"));
        assert!(src.contains(
            "acc0 += (in0[base0 + i0 * 3UL + i1 * 1UL] * in1[base1 + i1 * 5UL + i2 * 1UL]);"
        ));
        assert!(src.contains("out[gid] = acc0;"));
    }
}

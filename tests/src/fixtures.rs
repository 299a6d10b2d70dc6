//! Kernels and inputs shared by the integration flows and benchmarks.

use rand::Rng;
use vectorize::{
    Expr, GpuSupportError, GuFunction, GuSignature, Registry, RegistryBuilder, ScalarFunction,
    VectorizeConfig,
};

/// `ln(1 + e^x)`
pub fn softplus() -> ScalarFunction {
    let x = Expr::arg(0);
    ScalarFunction::new("softplus", 1, (x.exp() + 1.0).ln()).expect("valid kernel")
}

/// `sqrt(x^2 + y^2)`
pub fn hypot() -> ScalarFunction {
    let (x, y) = (Expr::arg(0), Expr::arg(1));
    ScalarFunction::new("hypot", 2, (x.clone() * x + y.clone() * y).sqrt()).expect("valid kernel")
}

/// `x < 0 ? a * x : x`
pub fn leaky_relu() -> ScalarFunction {
    let x = Expr::arg(0);
    let body = Expr::select(
        x.clone().lt(Expr::constant(0.0)),
        Expr::arg(1) * x.clone(),
        x,
    );
    ScalarFunction::new("leaky_relu", 2, body).expect("valid kernel")
}

/// `(m,n),(n,p)->(m,p)`
pub fn matmul() -> (GuFunction, GuSignature) {
    let body = Expr::sum(
        "n",
        Expr::element(0, ["m", "n"]) * Expr::element(1, ["n", "p"]),
    );
    (
        GuFunction::new("matmul", body),
        GuSignature::parse("(m,n),(n,p)->(m,p)").expect("valid signature"),
    )
}

/// `(n),(n)->()`
pub fn inner() -> (GuFunction, GuSignature) {
    let body = Expr::sum("n", Expr::element(0, ["n"]) * Expr::element(1, ["n"]));
    (
        GuFunction::new("inner", body),
        GuSignature::parse("(n),(n)->()").expect("valid signature"),
    )
}

/// Standard tables with the gpu target on its CPU fallback.
pub fn cpu_registry(config: &VectorizeConfig) -> Registry {
    RegistryBuilder::standard(config, Err(GpuSupportError::Disabled)).build()
}

pub fn random_vec(len: usize) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(-4.0..4.0)).collect()
}

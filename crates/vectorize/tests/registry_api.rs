//! Public entry points against the process-wide registry.

use vectorize::{
    gu_vectorize, gu_vectorize_with, vectorize, vectorize_with, ConfigurationError, Expr,
    GuFunction, GuSignature, NdArray, Registry, ScalarFunction, Strategy, Target, VectorizerKind,
};

fn relu() -> ScalarFunction {
    let x = Expr::arg(0);
    ScalarFunction::new("relu", 1, x.max(Expr::constant(0.0))).unwrap()
}

fn row_sum() -> (GuFunction, GuSignature) {
    (
        GuFunction::new("row_sum", Expr::sum("n", Expr::element(0, ["n"]))),
        "(n)->()".parse().unwrap(),
    )
}

#[test]
fn default_pair_is_ast_cpu() {
    let default = vectorize(relu()).unwrap();
    let explicit = vectorize_with(relu(), "ast", "cpu").unwrap();
    assert_eq!(default.kind(), explicit.kind());
    assert_eq!(default.kind(), VectorizerKind::BasicAstVectorize);

    let (func, sig) = row_sum();
    let gu = gu_vectorize(func, sig).unwrap();
    assert_eq!(gu.kind(), VectorizerKind::GuFuncAstVectorize);
}

#[test]
fn every_registered_pair_constructs() {
    let registry = Registry::global();
    for strategy in registry.strategies() {
        for target in registry.targets(strategy) {
            let vectorizer = vectorize_with(relu(), strategy.as_str(), target.as_str()).unwrap();
            let kind = registry.resolve(strategy, target).unwrap();
            assert_eq!(vectorizer.kind(), kind);
        }
    }
    for strategy in registry.gu_strategies() {
        for target in registry.gu_targets(strategy) {
            let (func, sig) = row_sum();
            let vectorizer =
                gu_vectorize_with(func, sig, strategy.as_str(), target.as_str()).unwrap();
            let kind = registry.resolve_gu(strategy, target).unwrap();
            assert_eq!(vectorizer.kind(), kind);
        }
    }
}

#[test]
fn gpu_target_always_constructs() {
    let registry = Registry::global();
    let gpu = vectorize_with(relu(), "ast", "gpu").unwrap();

    if registry.gpu_available() {
        assert_eq!(gpu.kind(), VectorizerKind::GpuAstVectorize);
        assert!(registry.gpu_fallback_reason().is_none());
    } else {
        assert_eq!(gpu.kind(), vectorize(relu()).unwrap().kind());
        assert!(registry.gpu_fallback_reason().is_some());

        let ufunc = gpu.build_ufunc().unwrap();
        assert_eq!(ufunc.call(&[&[-1.0, 2.0]]).unwrap(), vec![0.0, 2.0]);
    }
}

#[test]
fn invalid_requests_name_the_valid_set() {
    match vectorize_with(relu(), "cuda", "cpu") {
        Err(ConfigurationError::UnknownBackend { value, valid }) => {
            assert_eq!(value, "cuda");
            assert_eq!(valid, vec!["bytecode", "ast", "mini"]);
        }
        other => panic!("unexpected: {:?}", other.map(|v| v.kind())),
    }

    let err = vectorize_with(relu(), "mini", "gpu").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("(valid: cpu, parallel)"), "{}", message);

    let (func, sig) = row_sum();
    let err = gu_vectorize_with(func, sig, "mini", "cpu").unwrap_err();
    assert!(matches!(err, ConfigurationError::UnsupportedBackend { .. }));

    let (func, sig) = row_sum();
    let err = gu_vectorize_with(func, sig, "bytecode", "parallel").unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::UnsupportedTarget { ref valid, .. } if valid == &["cpu"]
    ));
}

#[test]
fn gufunc_round_trip_through_registry() {
    let (func, sig) = row_sum();
    let ufunc = Registry::global()
        .gu_vectorize(func, sig, Strategy::Bytecode, Target::Cpu)
        .unwrap()
        .build_ufunc()
        .unwrap();
    let rows = NdArray::new(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    let out = ufunc.call(&[rows]).unwrap();
    assert_eq!(out.shape(), [2]);
    assert_eq!(out.data(), [6.0, 15.0]);
}

//! # Registry Flows
//!
//! 1. **JSON config → registry**: tunables reach the stream and parallel executors
//! 2. **Cross-strategy agreement**: every registered pair computes the same values
//! 3. **Gufunc flows**: batched matmul and broadcast inner product
//! 4. **Fallback observability**: the GPU fallback warning is visible through the telemetry filter

#[cfg(test)]
mod tests {
    use crate::fixtures::{cpu_registry, hypot, inner, leaky_relu, matmul, random_vec, softplus};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;
    use vectorize::{
        GpuSupportError, NdArray, RegistryBuilder, Strategy, Target, VectorizeConfig,
        VectorizeError, VectorizerKind,
    };
    use vectorize_telemetry::{env_filter, vectorize_span, TelemetryConfig};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Records `(level, message)` of every event that passes the filter.
    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<(tracing::Level, String)>>>);

    struct MessageVisitor<'a>(&'a mut String);

    impl tracing::field::Visit for MessageVisitor<'_> {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                *self.0 = format!("{:?}", value);
            }
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for Recorder {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut message = String::new();
            event.record(&mut MessageVisitor(&mut message));
            if let Ok(mut events) = self.0.lock() {
                events.push((*event.metadata().level(), message));
            }
        }
    }

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() <= 1e-12 * x.abs().max(1.0), "{} vs {}", x, y);
        }
    }

    // =============================================================================
    // FLOWS
    // =============================================================================

    #[test]
    fn test_json_config_reaches_executors() {
        let config = VectorizeConfig::from_json(
            r#"{ "stream_chunk_size": 7, "parallel_min_chunk": 5, "gpu_disabled": true }"#,
        )
        .unwrap();
        assert_eq!(config.gpu_platform, 0);

        let registry = cpu_registry(&config);
        let xs = random_vec(101);
        let expected: Vec<f64> = xs.iter().map(|x| (x.exp() + 1.0).ln()).collect();

        for target in [Target::Stream, Target::Parallel] {
            let ufunc = registry
                .vectorize(softplus(), Strategy::Bytecode, target)
                .unwrap()
                .build_ufunc()
                .unwrap();
            assert_close(&ufunc.call(&[&xs]).unwrap(), &expected);
        }
    }

    #[test]
    fn test_invalid_json_config_is_rejected() {
        assert!(VectorizeConfig::from_json(r#"{ "stream_chunk_size": 0 }"#).is_err());
        assert!(VectorizeConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_every_pair_agrees_on_two_argument_kernels() {
        let registry = cpu_registry(&VectorizeConfig::default().with_parallel_min_chunk(16));
        let xs = random_vec(257);
        let ys = random_vec(257);

        for func in [hypot(), leaky_relu()] {
            let reference = registry
                .vectorize(func.clone(), Strategy::Mini, Target::Cpu)
                .unwrap()
                .build_ufunc()
                .unwrap()
                .call(&[&xs, &ys])
                .unwrap();

            for strategy in registry.strategies() {
                for target in registry.targets(strategy) {
                    let _span = vectorize_span!(
                        "pair",
                        strategy = %strategy,
                        target = %target
                    )
                    .entered();
                    let out = registry
                        .vectorize(func.clone(), strategy, target)
                        .unwrap()
                        .build_ufunc()
                        .unwrap()
                        .call(&[&xs, &ys])
                        .unwrap();
                    assert_eq!(out, reference, "{} {}/{}", func.name(), strategy, target);
                }
            }
        }
    }

    #[test]
    fn test_broadcast_scalar_argument() {
        let registry = cpu_registry(&VectorizeConfig::default());
        let ufunc = registry
            .vectorize(leaky_relu(), Strategy::Ast, Target::Stream)
            .unwrap()
            .build_ufunc()
            .unwrap();
        let out = ufunc.call(&[&[-2.0, 3.0, -1.0], &[0.5]]).unwrap();
        assert_eq!(out, vec![-1.0, 3.0, -0.5]);

        assert!(matches!(
            ufunc.call(&[&[1.0, 2.0, 3.0], &[1.0, 2.0]]),
            Err(VectorizeError::LengthMismatch { index: 1, .. })
        ));
        assert!(matches!(
            ufunc.call(&[&[1.0]]),
            Err(VectorizeError::ArityMismatch {
                expected: 2,
                got: 1,
            })
        ));
    }

    #[test]
    fn test_batched_matmul_across_strategies() {
        let registry = cpu_registry(&VectorizeConfig::default());
        let (func, sig) = matmul();

        // two 2x2 blocks times a shared 2x1 column
        let blocks = vec![1.0, 2.0, 3.0, 4.0, 0.0, 1.0, 1.0, 0.0];
        let a = NdArray::new(vec![2, 2, 2], blocks).unwrap();
        let b = NdArray::new(vec![2, 1], vec![5.0, 6.0]).unwrap();

        for strategy in registry.gu_strategies() {
            let ufunc = registry
                .gu_vectorize(func.clone(), sig.clone(), strategy, Target::Cpu)
                .unwrap()
                .build_ufunc()
                .unwrap();
            let out = ufunc.call(&[a.clone(), b.clone()]).unwrap();
            assert_eq!(out.shape(), [2, 2, 1]);
            assert_eq!(out.data(), [17.0, 39.0, 6.0, 5.0]);
        }
    }

    #[test]
    fn test_inner_product_with_broadcast_vector() {
        let registry = cpu_registry(&VectorizeConfig::default());
        let (func, sig) = inner();
        let ufunc = registry
            .gu_vectorize(func, sig, Strategy::Ast, Target::Gpu)
            .unwrap();
        assert_eq!(ufunc.kind(), VectorizerKind::GuFuncAstVectorize);

        let rows = NdArray::new(vec![2, 3], vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
        let weights = NdArray::from_vec(vec![2.0, 3.0, 4.0]);
        let out = ufunc.build_ufunc().unwrap().call(&[rows, weights]).unwrap();
        assert_eq!(out.data(), [2.0, 9.0]);
    }

    #[test]
    fn test_fallback_warning_passes_default_filter() {
        let recorder = Recorder::default();
        let filter = env_filter(&TelemetryConfig::default()).unwrap();
        let layer = recorder.clone().with_filter(filter);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            let registry = RegistryBuilder::standard(
                &VectorizeConfig::default(),
                Err(GpuSupportError::NoPlatform("simulated".to_string())),
            )
            .build();
            let ufunc = registry
                .vectorize(softplus(), Strategy::Ast, Target::Gpu)
                .unwrap()
                .build_ufunc()
                .unwrap();
            ufunc.call(&[&[0.0]]).unwrap();
        });

        let events = recorder.0.lock().unwrap();
        // debug build/call events are filtered out at the default level
        assert_eq!(events.len(), 1, "{:?}", *events);
        assert_eq!(events[0].0, tracing::Level::WARN);
        assert!(events[0].1.contains("falls back"));
    }
}

//! Vectorizer registry
//!
//! Lookup tables from `(Strategy, Target)` to vectorizer constructors, one
//! family for elementwise functions and one for generalized ufuncs.
//!
//! ```text
//! strategy   cpu                parallel               stream              gpu
//! bytecode   BasicVectorize     ParallelVectorize      StreamVectorize     -
//! ast        BasicAstVectorize  ParallelAstVectorize   StreamAstVectorize  GpuAstVectorize
//! mini       MiniVectorize      ParallelMiniVectorize  -                   -
//!
//! gu bytecode  GuFuncVectorize     -
//! gu ast       GuFuncAstVectorize  GpuGuFuncAstVectorize
//! ```
//!
//! Tables are built once and never mutated. A request is validated against
//! them before any constructor runs, and every request invokes the
//! constructor again; nothing is cached.

use crate::backends::basic::{BasicAstVectorize, BasicVectorize};
use crate::backends::gpu::{GpuAstVectorize, GpuDevice, GpuGuFuncAstVectorize};
use crate::backends::gufunc::{GuFuncAstVectorize, GuFuncVectorize};
use crate::backends::mini::{MiniVectorize, ParallelMiniVectorize};
use crate::backends::parallel::{ParallelAstVectorize, ParallelVectorize};
use crate::backends::stream::{StreamAstVectorize, StreamVectorize};
use crate::backends::{GuVectorizer, Vectorizer};
use crate::config::VectorizeConfig;
use crate::domain::{GuFunction, GuSignature, ScalarFunction, Strategy, Target, VectorizerKind};
use crate::error::{ConfigurationError, GpuSupportError};
use lazy_static::lazy_static;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds an elementwise vectorizer from a scalar function.
pub type VectorizerCtor = Arc<dyn Fn(ScalarFunction) -> Box<dyn Vectorizer> + Send + Sync>;

/// Builds a gufunc vectorizer from a core function and its signature.
pub type GuVectorizerCtor =
    Arc<dyn Fn(GuFunction, GuSignature) -> Box<dyn GuVectorizer> + Send + Sync>;

struct Entry<C> {
    kind: VectorizerKind,
    ctor: C,
}

type Table<C> = BTreeMap<Strategy, BTreeMap<Target, Entry<C>>>;

lazy_static! {
    /// Process-wide registry configured from the environment
    static ref GLOBAL: Registry = Registry::new(&VectorizeConfig::from_env());
}

fn lookup<C>(
    table: &Table<C>,
    strategy: Strategy,
    target: Target,
) -> Result<&Entry<C>, ConfigurationError> {
    let targets = table
        .get(&strategy)
        .ok_or_else(|| ConfigurationError::UnsupportedBackend {
            backend: strategy.to_string(),
            valid: table.keys().map(ToString::to_string).collect(),
        })?;

    targets
        .get(&target)
        .ok_or_else(|| ConfigurationError::UnsupportedTarget {
            backend: strategy.to_string(),
            target: target.to_string(),
            valid: targets.keys().map(ToString::to_string).collect(),
        })
}

fn insert<C>(table: &mut Table<C>, strategy: Strategy, target: Target, entry: Entry<C>) {
    table.entry(strategy).or_default().insert(target, entry);
}

/// Assembles the lookup tables of a [`Registry`].
pub struct RegistryBuilder {
    vectorizers: Table<VectorizerCtor>,
    gu_vectorizers: Table<GuVectorizerCtor>,
    gpu: Option<Arc<GpuDevice>>,
    fallback: Option<GpuSupportError>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// Empty tables.
    pub fn new() -> Self {
        Self {
            vectorizers: BTreeMap::new(),
            gu_vectorizers: BTreeMap::new(),
            gpu: None,
            fallback: None,
        }
    }

    /// The default tables.
    ///
    /// When `gpu` is an error the gpu entries are bound to the CPU
    /// vectorizers instead, and a single warning is logged.
    pub fn standard(
        config: &VectorizeConfig,
        gpu: Result<Arc<GpuDevice>, GpuSupportError>,
    ) -> Self {
        let c = config.clone();
        let mut builder = Self::new()
            .vectorizer(
                Strategy::Bytecode,
                Target::Cpu,
                VectorizerKind::BasicVectorize,
                |f| Box::new(BasicVectorize::new(f)),
            )
            .vectorizer(
                Strategy::Bytecode,
                Target::Parallel,
                VectorizerKind::ParallelVectorize,
                {
                    let c = c.clone();
                    move |f| Box::new(ParallelVectorize::new(f, &c))
                },
            )
            .vectorizer(
                Strategy::Bytecode,
                Target::Stream,
                VectorizerKind::StreamVectorize,
                {
                    let c = c.clone();
                    move |f| Box::new(StreamVectorize::new(f, &c))
                },
            )
            .vectorizer(
                Strategy::Ast,
                Target::Cpu,
                VectorizerKind::BasicAstVectorize,
                |f| Box::new(BasicAstVectorize::new(f)),
            )
            .vectorizer(
                Strategy::Ast,
                Target::Parallel,
                VectorizerKind::ParallelAstVectorize,
                {
                    let c = c.clone();
                    move |f| Box::new(ParallelAstVectorize::new(f, &c))
                },
            )
            .vectorizer(
                Strategy::Ast,
                Target::Stream,
                VectorizerKind::StreamAstVectorize,
                {
                    let c = c.clone();
                    move |f| Box::new(StreamAstVectorize::new(f, &c))
                },
            )
            .vectorizer(
                Strategy::Mini,
                Target::Cpu,
                VectorizerKind::MiniVectorize,
                |f| Box::new(MiniVectorize::new(f)),
            )
            .vectorizer(
                Strategy::Mini,
                Target::Parallel,
                VectorizerKind::ParallelMiniVectorize,
                move |f| Box::new(ParallelMiniVectorize::new(f, &c)),
            )
            .gu_vectorizer(
                Strategy::Bytecode,
                Target::Cpu,
                VectorizerKind::GuFuncVectorize,
                |f, s| Box::new(GuFuncVectorize::new(f, s)),
            )
            .gu_vectorizer(
                Strategy::Ast,
                Target::Cpu,
                VectorizerKind::GuFuncAstVectorize,
                |f, s| Box::new(GuFuncAstVectorize::new(f, s)),
            );

        match gpu {
            Ok(device) => {
                let scalar_device = Arc::clone(&device);
                let gu_device = Arc::clone(&device);
                builder = builder
                    .vectorizer(
                        Strategy::Ast,
                        Target::Gpu,
                        VectorizerKind::GpuAstVectorize,
                        move |f| Box::new(GpuAstVectorize::new(f, Arc::clone(&scalar_device))),
                    )
                    .gu_vectorizer(
                        Strategy::Ast,
                        Target::Gpu,
                        VectorizerKind::GpuGuFuncAstVectorize,
                        move |f, s| {
                            Box::new(GpuGuFuncAstVectorize::new(f, s, Arc::clone(&gu_device)))
                        },
                    );
                builder.gpu = Some(device);
            }
            Err(reason) => {
                warn!(
                    reason = %reason,
                    "GPU support unavailable, gpu target falls back to cpu vectorizers"
                );
                builder = builder
                    .vectorizer(
                        Strategy::Ast,
                        Target::Gpu,
                        VectorizerKind::BasicAstVectorize,
                        |f| Box::new(BasicAstVectorize::new(f)),
                    )
                    .gu_vectorizer(
                        Strategy::Ast,
                        Target::Gpu,
                        VectorizerKind::GuFuncAstVectorize,
                        |f, s| Box::new(GuFuncAstVectorize::new(f, s)),
                    );
                builder.fallback = Some(reason);
            }
        }

        builder
    }

    /// Add or replace an elementwise entry.
    pub fn vectorizer<F>(
        mut self,
        strategy: Strategy,
        target: Target,
        kind: VectorizerKind,
        ctor: F,
    ) -> Self
    where
        F: Fn(ScalarFunction) -> Box<dyn Vectorizer> + Send + Sync + 'static,
    {
        let ctor: VectorizerCtor = Arc::new(ctor);
        let entry = Entry { kind, ctor };
        insert(&mut self.vectorizers, strategy, target, entry);
        self
    }

    /// Add or replace a gufunc entry.
    pub fn gu_vectorizer<F>(
        mut self,
        strategy: Strategy,
        target: Target,
        kind: VectorizerKind,
        ctor: F,
    ) -> Self
    where
        F: Fn(GuFunction, GuSignature) -> Box<dyn GuVectorizer> + Send + Sync + 'static,
    {
        let ctor: GuVectorizerCtor = Arc::new(ctor);
        let entry = Entry { kind, ctor };
        insert(&mut self.gu_vectorizers, strategy, target, entry);
        self
    }

    pub fn build(self) -> Registry {
        let vectorizers: usize = self.vectorizers.values().map(BTreeMap::len).sum();
        let gu_vectorizers: usize = self.gu_vectorizers.values().map(BTreeMap::len).sum();
        debug!(
            vectorizers,
            gu_vectorizers,
            gpu = self.gpu.is_some(),
            "Built vectorizer registry"
        );
        Registry {
            vectorizers: self.vectorizers,
            gu_vectorizers: self.gu_vectorizers,
            gpu: self.gpu,
            fallback: self.fallback,
        }
    }
}

/// Immutable `(Strategy, Target)` lookup tables.
pub struct Registry {
    vectorizers: Table<VectorizerCtor>,
    gu_vectorizers: Table<GuVectorizerCtor>,
    gpu: Option<Arc<GpuDevice>>,
    fallback: Option<GpuSupportError>,
}

impl Registry {
    /// Default tables, acquiring a GPU according to `config`.
    pub fn new(config: &VectorizeConfig) -> Self {
        RegistryBuilder::standard(config, GpuDevice::acquire(config)).build()
    }

    /// The process-wide registry, built on first use from
    /// [`VectorizeConfig::from_env`].
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Construct the elementwise vectorizer registered for `(strategy, target)`.
    pub fn vectorize(
        &self,
        func: ScalarFunction,
        strategy: Strategy,
        target: Target,
    ) -> Result<Box<dyn Vectorizer>, ConfigurationError> {
        let entry = lookup(&self.vectorizers, strategy, target)?;
        debug!(
            %strategy,
            %target,
            kind = %entry.kind,
            name = func.name(),
            "Constructing vectorizer"
        );
        Ok((entry.ctor)(func))
    }

    /// [`Registry::vectorize`] with the strategy and target given by name.
    pub fn vectorize_named(
        &self,
        func: ScalarFunction,
        backend: &str,
        target: &str,
    ) -> Result<Box<dyn Vectorizer>, ConfigurationError> {
        self.vectorize(func, backend.parse()?, target.parse()?)
    }

    /// Construct the gufunc vectorizer registered for `(strategy, target)`.
    pub fn gu_vectorize(
        &self,
        func: GuFunction,
        signature: GuSignature,
        strategy: Strategy,
        target: Target,
    ) -> Result<Box<dyn GuVectorizer>, ConfigurationError> {
        let entry = lookup(&self.gu_vectorizers, strategy, target)?;
        debug!(
            %strategy,
            %target,
            kind = %entry.kind,
            name = func.name(),
            signature = %signature,
            "Constructing gufunc vectorizer"
        );
        Ok((entry.ctor)(func, signature))
    }

    /// [`Registry::gu_vectorize`] with the strategy and target given by name.
    pub fn gu_vectorize_named(
        &self,
        func: GuFunction,
        signature: GuSignature,
        backend: &str,
        target: &str,
    ) -> Result<Box<dyn GuVectorizer>, ConfigurationError> {
        self.gu_vectorize(func, signature, backend.parse()?, target.parse()?)
    }

    /// Constructor kind registered for an elementwise pair.
    pub fn resolve(
        &self,
        strategy: Strategy,
        target: Target,
    ) -> Result<VectorizerKind, ConfigurationError> {
        lookup(&self.vectorizers, strategy, target).map(|entry| entry.kind)
    }

    /// Constructor kind registered for a gufunc pair.
    pub fn resolve_gu(
        &self,
        strategy: Strategy,
        target: Target,
    ) -> Result<VectorizerKind, ConfigurationError> {
        lookup(&self.gu_vectorizers, strategy, target).map(|entry| entry.kind)
    }

    pub fn strategies(&self) -> Vec<Strategy> {
        self.vectorizers.keys().copied().collect()
    }

    pub fn gu_strategies(&self) -> Vec<Strategy> {
        self.gu_vectorizers.keys().copied().collect()
    }

    /// Targets registered under `strategy`; empty when the strategy has no table.
    pub fn targets(&self, strategy: Strategy) -> Vec<Target> {
        self.vectorizers
            .get(&strategy)
            .map(|targets| targets.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn gu_targets(&self, strategy: Strategy) -> Vec<Target> {
        self.gu_vectorizers
            .get(&strategy)
            .map(|targets| targets.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn gpu_available(&self) -> bool {
        self.gpu.is_some()
    }

    /// The acquired device; `info()` reports what it is.
    pub fn gpu_device(&self) -> Option<&Arc<GpuDevice>> {
        self.gpu.as_ref()
    }

    /// Why the gpu target was rebound to the CPU, if it was.
    pub fn gpu_fallback_reason(&self) -> Option<&GpuSupportError> {
        self.fallback.as_ref()
    }
}

fn describe<C>(table: &Table<C>) -> BTreeMap<String, BTreeMap<Target, VectorizerKind>> {
    table
        .iter()
        .map(|(strategy, targets)| {
            let kinds = targets.iter().map(|(t, e)| (*t, e.kind)).collect();
            (strategy.to_string(), kinds)
        })
        .collect()
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("vectorizers", &describe(&self.vectorizers))
            .field("gu_vectorizers", &describe(&self.gu_vectorizers))
            .field("gpu", &self.gpu)
            .field("fallback", &self.fallback)
            .finish()
    }
}

//! Registry keys: code-generation strategy and execution target

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Code-generation approach used to compile a kernel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Stack bytecode, interpreted
    Bytecode,
    /// Closure-compiled expression tree
    #[default]
    Ast,
    /// Minimal tree-walking evaluator
    Mini,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Bytecode, Strategy::Ast, Strategy::Mini];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Bytecode => "bytecode",
            Strategy::Ast => "ast",
            Strategy::Mini => "mini",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| ConfigurationError::UnknownBackend {
                value: s.to_string(),
                valid: Strategy::ALL.iter().map(ToString::to_string).collect(),
            })
    }
}

/// Execution environment of a vectorized function.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Single-threaded loop
    #[default]
    Cpu,
    /// Multi-threaded loop (rayon)
    Parallel,
    /// Chunked loop over contiguous scratch buffers
    Stream,
    /// OpenCL device
    Gpu,
}

impl Target {
    pub const ALL: [Target; 4] = [Target::Cpu, Target::Parallel, Target::Stream, Target::Gpu];

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Cpu => "cpu",
            Target::Parallel => "parallel",
            Target::Stream => "stream",
            Target::Gpu => "gpu",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::ALL
            .into_iter()
            .find(|target| target.as_str() == s)
            .ok_or_else(|| ConfigurationError::UnknownTarget {
                value: s.to_string(),
                valid: Target::ALL.iter().map(ToString::to_string).collect(),
            })
    }
}

/// Identity of the constructor behind a registry entry.
///
/// Two entries with the same kind build the same vectorizer; this is how the
/// GPU fallback is observed from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorizerKind {
    BasicVectorize,
    BasicAstVectorize,
    ParallelVectorize,
    ParallelAstVectorize,
    StreamVectorize,
    StreamAstVectorize,
    GpuAstVectorize,
    MiniVectorize,
    ParallelMiniVectorize,
    GuFuncVectorize,
    GuFuncAstVectorize,
    GpuGuFuncAstVectorize,
}

impl VectorizerKind {
    pub fn name(&self) -> &'static str {
        match self {
            VectorizerKind::BasicVectorize => "BasicVectorize",
            VectorizerKind::BasicAstVectorize => "BasicAstVectorize",
            VectorizerKind::ParallelVectorize => "ParallelVectorize",
            VectorizerKind::ParallelAstVectorize => "ParallelAstVectorize",
            VectorizerKind::StreamVectorize => "StreamVectorize",
            VectorizerKind::StreamAstVectorize => "StreamAstVectorize",
            VectorizerKind::GpuAstVectorize => "GpuAstVectorize",
            VectorizerKind::MiniVectorize => "MiniVectorize",
            VectorizerKind::ParallelMiniVectorize => "ParallelMiniVectorize",
            VectorizerKind::GuFuncVectorize => "GuFuncVectorize",
            VectorizerKind::GuFuncAstVectorize => "GuFuncAstVectorize",
            VectorizerKind::GpuGuFuncAstVectorize => "GpuGuFuncAstVectorize",
        }
    }
}

impl fmt::Display for VectorizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

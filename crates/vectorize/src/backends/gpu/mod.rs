//! GPU vectorizers (OpenCL)
//!
//! Device acquisition happens once per registry. Kernels are generated as
//! OpenCL C from the lowered program and compiled lazily per call layout.
//!
//! Build with `--features opencl` to enable the runtime; otherwise
//! [`GpuDevice::acquire`] always reports [`GpuSupportError::NotCompiled`]
//! and the registry aliases the gpu target to the CPU vectorizers.

pub mod codegen;
#[cfg(feature = "opencl")]
mod opencl;

use super::{BoundCall, ElementwiseExecutor, GuExecutor, GuUfunc, GuVectorizer, Ufunc, Vectorizer};
use crate::compile::lower::{lower_gufunc, lower_scalar, Program};
use crate::config::VectorizeConfig;
use crate::domain::{GuFunction, GuSignature, ScalarFunction, VectorizerKind};
use crate::error::{GpuSupportError, VectorizeError};
use serde::Serialize;
use std::sync::Arc;

/// Properties of the acquired device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    pub compute_units: u32,
    pub memory_bytes: u64,
    pub supports_f64: bool,
}

/// An acquired OpenCL device, shared by every GPU vectorizer of a registry.
pub struct GpuDevice {
    #[cfg(feature = "opencl")]
    runtime: opencl::OpenClRuntime,
    /// Without a runtime no device can be acquired.
    #[cfg(not(feature = "opencl"))]
    never: std::convert::Infallible,
}

impl std::fmt::Debug for GpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuDevice")
            .field("info", self.info())
            .finish()
    }
}

impl GpuDevice {
    /// Acquire a device according to `config`.
    pub fn acquire(config: &VectorizeConfig) -> Result<Arc<GpuDevice>, GpuSupportError> {
        if config.gpu_disabled {
            return Err(GpuSupportError::Disabled);
        }
        Self::open(config.gpu_platform).map(Arc::new)
    }

    #[cfg(feature = "opencl")]
    fn open(platform: usize) -> Result<Self, GpuSupportError> {
        let runtime = opencl::OpenClRuntime::acquire(platform)?;
        let info = runtime.info();
        tracing::info!(
            device = %info.name,
            compute_units = info.compute_units,
            memory_mb = info.memory_bytes / 1_000_000,
            "Acquired OpenCL device"
        );
        Ok(Self { runtime })
    }

    #[cfg(not(feature = "opencl"))]
    fn open(_platform: usize) -> Result<Self, GpuSupportError> {
        Err(GpuSupportError::NotCompiled)
    }

    pub fn info(&self) -> &DeviceInfo {
        #[cfg(feature = "opencl")]
        {
            self.runtime.info()
        }
        #[cfg(not(feature = "opencl"))]
        {
            match self.never {}
        }
    }

    fn launch(
        &self,
        source: &str,
        kernel_name: &str,
        inputs: &[&[f64]],
        n: usize,
    ) -> Result<Vec<f64>, VectorizeError> {
        #[cfg(feature = "opencl")]
        {
            self.runtime.launch(source, kernel_name, inputs, n)
        }
        #[cfg(not(feature = "opencl"))]
        {
            let _ = (source, kernel_name, inputs, n);
            match self.never {}
        }
    }
}

/// Elementwise kernel launch, one work item per output element.
pub struct GpuExecutor {
    device: Arc<GpuDevice>,
    program: Program,
    kernel_name: String,
}

impl ElementwiseExecutor for GpuExecutor {
    fn run(&self, args: &[&[f64]], len: usize) -> Result<Vec<f64>, VectorizeError> {
        if len == 0 {
            return Ok(Vec::new());
        }
        let broadcast: Vec<bool> = args.iter().map(|arg| arg.len() == 1).collect();
        let source = codegen::scalar_kernel(&self.kernel_name, &self.program, &broadcast);
        self.device.launch(&source, &self.kernel_name, args, len)
    }
}

/// Gufunc kernel launch, one work item per element of the full output.
pub struct GpuGuExecutor {
    device: Arc<GpuDevice>,
    program: Program,
    kernel_name: String,
}

impl GuExecutor for GpuGuExecutor {
    fn run(&self, call: &BoundCall<'_>) -> Result<Vec<f64>, VectorizeError> {
        let total = call.loop_count * call.output_core_size;
        if total == 0 {
            return Ok(Vec::new());
        }
        let source = codegen::gufunc_kernel(&self.kernel_name, &self.program, call);
        let inputs: Vec<&[f64]> = call.inputs.iter().map(|input| input.data()).collect();
        self.device
            .launch(&source, &self.kernel_name, &inputs, total)
    }
}

/// AST strategy, gpu target.
pub struct GpuAstVectorize {
    func: ScalarFunction,
    device: Arc<GpuDevice>,
}

impl GpuAstVectorize {
    pub fn new(func: ScalarFunction, device: Arc<GpuDevice>) -> Self {
        Self { func, device }
    }
}

impl Vectorizer for GpuAstVectorize {
    fn kind(&self) -> VectorizerKind {
        VectorizerKind::GpuAstVectorize
    }

    fn function(&self) -> &ScalarFunction {
        &self.func
    }

    fn build_ufunc(&self) -> Result<Ufunc, VectorizeError> {
        let program = lower_scalar(&self.func)?;
        let executor = GpuExecutor {
            device: Arc::clone(&self.device),
            program,
            kernel_name: codegen::kernel_name(self.func.name()),
        };
        Ok(Ufunc::new(&self.func, self.kind(), Box::new(executor)))
    }
}

/// AST strategy, gpu target, generalized ufuncs.
pub struct GpuGuFuncAstVectorize {
    func: GuFunction,
    signature: GuSignature,
    device: Arc<GpuDevice>,
}

impl GpuGuFuncAstVectorize {
    pub fn new(func: GuFunction, signature: GuSignature, device: Arc<GpuDevice>) -> Self {
        Self {
            func,
            signature,
            device,
        }
    }
}

impl GuVectorizer for GpuGuFuncAstVectorize {
    fn kind(&self) -> VectorizerKind {
        VectorizerKind::GpuGuFuncAstVectorize
    }

    fn function(&self) -> &GuFunction {
        &self.func
    }

    fn signature(&self) -> &GuSignature {
        &self.signature
    }

    fn build_ufunc(&self) -> Result<GuUfunc, VectorizeError> {
        let program = lower_gufunc(&self.func, &self.signature)?;
        let executor = GpuGuExecutor {
            device: Arc::clone(&self.device),
            program: program.clone(),
            kernel_name: codegen::kernel_name(self.func.name()),
        };
        Ok(GuUfunc::new(
            &self.func,
            &self.signature,
            self.kind(),
            program,
            Box::new(executor),
        ))
    }
}

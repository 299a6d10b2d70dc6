//! OpenCL device runtime
//!
//! Works on any OpenCL 1.2 device that exposes `cl_khr_fp64`.
//!
//! NOTE: ocl::Kernel holds raw pointers and is not Sync, so kernels are built
//! per launch. Compiled programs are cached by source behind a Mutex.

use super::DeviceInfo;
use crate::error::{GpuSupportError, VectorizeError};
use std::collections::HashMap;
use std::sync::Mutex;

pub struct OpenClRuntime {
    info: DeviceInfo,
    device: ocl::Device,
    context: ocl::Context,
    queue: ocl::Queue,
    programs: Mutex<HashMap<String, ocl::Program>>,
}

impl OpenClRuntime {
    /// Open the first GPU (or, failing that, any device) on platform `platform_index`.
    pub fn acquire(platform_index: usize) -> Result<Self, GpuSupportError> {
        // get_platform_ids returns an error instead of panicking when no ICD is installed
        let platform_ids = ocl::core::get_platform_ids().map_err(|e| {
            GpuSupportError::NoPlatform(format!(
                "failed to list OpenCL platforms: {}. Is OpenCL installed?",
                e
            ))
        })?;

        let platform_id = platform_ids.get(platform_index).cloned().ok_or_else(|| {
            GpuSupportError::NoPlatform(format!(
                "platform index {} out of range ({} found)",
                platform_index,
                platform_ids.len()
            ))
        })?;
        let platform = ocl::Platform::new(platform_id);

        let device = ocl::Device::list(platform, Some(ocl::flags::DeviceType::GPU))
            .map_err(|e| GpuSupportError::NoDevice(e.to_string()))?
            .into_iter()
            .next()
            .or_else(|| ocl::Device::list(platform, None).ok()?.into_iter().next())
            .ok_or_else(|| GpuSupportError::NoDevice("no OpenCL device found".to_string()))?;

        let info = device_info(&device);
        if !info.supports_f64 {
            return Err(GpuSupportError::NoDoublePrecision(info.name));
        }

        let context = ocl::Context::builder()
            .platform(platform)
            .devices(device)
            .build()
            .map_err(|e| GpuSupportError::Initialization(e.to_string()))?;

        let queue = ocl::Queue::new(&context, device, None)
            .map_err(|e| GpuSupportError::Initialization(e.to_string()))?;

        Ok(Self {
            info,
            device,
            context,
            queue,
            programs: Mutex::new(HashMap::new()),
        })
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn program(&self, source: &str) -> Result<ocl::Program, VectorizeError> {
        let mut programs = self
            .programs
            .lock()
            .map_err(|e| VectorizeError::Launch(format!("program cache lock poisoned: {}", e)))?;

        if let Some(program) = programs.get(source) {
            return Ok(program.clone());
        }

        let program = ocl::Program::builder()
            .src(source)
            .devices(self.device)
            .build(&self.context)
            .map_err(|e| VectorizeError::Launch(e.to_string()))?;
        tracing::debug!(cached = programs.len() + 1, "Compiled OpenCL program");
        programs.insert(source.to_string(), program.clone());
        Ok(program)
    }

    fn input_buffer(&self, data: &[f64]) -> Result<ocl::Buffer<f64>, VectorizeError> {
        // Zero-length buffers are invalid; empty inputs are never read.
        let data = if data.is_empty() { &[0.0][..] } else { data };
        ocl::Buffer::<f64>::builder()
            .queue(self.queue.clone())
            .flags(ocl::flags::MemFlags::new().read_only())
            .len(data.len())
            .copy_host_slice(data)
            .build()
            .map_err(|e| VectorizeError::Launch(e.to_string()))
    }

    /// Run `kernel_name` from `source` over `n` work items and read back `out`.
    pub fn launch(
        &self,
        source: &str,
        kernel_name: &str,
        inputs: &[&[f64]],
        n: usize,
    ) -> Result<Vec<f64>, VectorizeError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let program = self.program(source)?;

        let buffers = inputs
            .iter()
            .map(|data| self.input_buffer(data))
            .collect::<Result<Vec<_>, _>>()?;

        let out_buf = ocl::Buffer::<f64>::builder()
            .queue(self.queue.clone())
            .flags(ocl::flags::MemFlags::new().write_only())
            .len(n)
            .build()
            .map_err(|e| VectorizeError::Launch(e.to_string()))?;

        let mut builder = ocl::Kernel::builder();
        builder
            .program(&program)
            .name(kernel_name)
            .queue(self.queue.clone())
            .global_work_size(n);
        for buffer in &buffers {
            builder.arg(buffer);
        }
        builder.arg(&out_buf).arg(n as u64);
        let kernel = builder
            .build()
            .map_err(|e| VectorizeError::Launch(e.to_string()))?;

        // SAFETY: every buffer argument outlives the launch, and the kernel
        // guards `gid < n` before touching `out`.
        unsafe {
            kernel
                .enq()
                .map_err(|e| VectorizeError::Launch(e.to_string()))?;
        }

        let mut out = vec![0.0; n];
        out_buf
            .read(&mut out)
            .enq()
            .map_err(|e| VectorizeError::Launch(e.to_string()))?;
        Ok(out)
    }
}

fn device_info(device: &ocl::Device) -> DeviceInfo {
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    let compute_units = device
        .info(ocl::core::DeviceInfo::MaxComputeUnits)
        .ok()
        .and_then(|v| match v {
            ocl::core::DeviceInfoResult::MaxComputeUnits(n) => Some(n),
            _ => None,
        })
        .unwrap_or(1);
    let memory_bytes = device
        .info(ocl::core::DeviceInfo::GlobalMemSize)
        .ok()
        .and_then(|v| match v {
            ocl::core::DeviceInfoResult::GlobalMemSize(n) => Some(n),
            _ => None,
        })
        .unwrap_or(0);
    let supports_f64 = matches!(
        device.info(ocl::core::DeviceInfo::DoubleFpConfig),
        Ok(ocl::core::DeviceInfoResult::DoubleFpConfig(config)) if !config.is_empty()
    );

    DeviceInfo {
        name,
        compute_units,
        memory_bytes,
        supports_f64,
    }
}

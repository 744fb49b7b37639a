use ort::{
    execution_providers::{
        CPUExecutionProvider, CUDAExecutionProvider, ExecutionProvider, ExecutionProviderDispatch,
    },
    session::Session,
};
use std::fmt;

/// Compute target the model sessions are placed on. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cuda,
    Cpu,
}

impl Device {
    /// Registers the CUDA provider on a throwaway session builder. If that
    /// fails, the CPU is selected.
    pub fn select() -> Self {
        Self::select_with(|| {
            let mut builder = Session::builder()?;
            CUDAExecutionProvider::default().register(&mut builder)?;
            Ok(())
        })
    }

    fn select_with<F>(register_cuda: F) -> Self
    where
        F: FnOnce() -> ort::Result<()>,
    {
        match register_cuda() {
            Ok(()) => Device::Cuda,
            Err(e) => {
                tracing::warn!("CUDA execution provider unavailable, using CPU: {}", e);
                Device::Cpu
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Cuda => "cuda",
            Device::Cpu => "cpu",
        }
    }

    pub fn execution_providers(&self) -> Vec<ExecutionProviderDispatch> {
        match self {
            Device::Cuda => vec![
                CUDAExecutionProvider::default().build(),
                CPUExecutionProvider::default().build(),
            ],
            Device::Cpu => vec![CPUExecutionProvider::default().build()],
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

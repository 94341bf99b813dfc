use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use clap::ValueEnum;
use tch::{Cuda, Device};

use crate::error::{BigramError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceChoice {
    /// CUDA when available, otherwise CPU.
    Auto,
    Cpu,
    Cuda,
}

/// Resolves the configured device. `cuda_library` is loaded first when given:
/// libtorch loads its CUDA backend lazily, so `Cuda::is_available` reports
/// false until something has pulled `libtorch_cuda.so` into the process.
pub fn select_device(choice: DeviceChoice, cuda_library: Option<&Path>) -> Result<Device> {
    if choice == DeviceChoice::Cpu {
        return Ok(Device::Cpu);
    }
    if let Some(library) = cuda_library {
        preload(library)?;
    }
    match choice {
        DeviceChoice::Cuda if !Cuda::is_available() => Err(BigramError::DeviceUnavailable(
            "CUDA was requested but libtorch reports no CUDA device".to_string(),
        )),
        DeviceChoice::Cuda => Ok(Device::Cuda(0)),
        _ => Ok(Device::cuda_if_available()),
    }
}

fn preload(library: &Path) -> Result<()> {
    let path = CString::new(library.as_os_str().as_bytes()).map_err(|_| {
        BigramError::DeviceUnavailable(format!("invalid library path {}", library.display()))
    })?;
    // SAFETY: `path` is a valid NUL-terminated string that outlives the call.
    let handle = unsafe { libc::dlopen(path.as_ptr(), libc::RTLD_LAZY) };
    if handle.is_null() {
        return Err(BigramError::DeviceUnavailable(format!(
            "could not load {}",
            library.display()
        )));
    }
    log::debug!("preloaded {}", library.display());
    Ok(())
}

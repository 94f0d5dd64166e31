use opencl3::device::{Device, CL_DEVICE_TYPE_ALL};
use opencl3::error_codes::{ClError, CL_DEVICE_NOT_FOUND};
use opencl3::platform::{get_platforms, Platform};
use tiletune_runtime::ServerError;

use crate::fatal_code;

/// An OpenCL device selected by platform and device index.
#[derive(Debug)]
pub struct OpenClDevice {
    platform: Platform,
    device: Device,
    /// Human-readable platform name.
    pub platform_name: String,
    /// Human-readable device name.
    pub device_name: String,
}

impl OpenClDevice {
    /// Selects the device at `(platform_index, device_index)`.
    ///
    /// Index errors are fatal: without a device there is no context to
    /// recover into.
    pub fn from_indices(platform_index: usize, device_index: usize) -> Result<Self, ServerError> {
        let platforms = get_platforms().map_err(|e| device_error(e, "platform enumeration"))?;
        let available = platforms.len();
        let platform = platforms.into_iter().nth(platform_index).ok_or_else(|| {
            not_found(format!(
                "platform index {platform_index} out of range ({available} found)"
            ))
        })?;
        let platform_name = platform.name().unwrap_or_default();

        let device_ids = platform
            .get_devices(CL_DEVICE_TYPE_ALL)
            .map_err(|e| device_error(e, "device enumeration"))?;
        let device_id = device_ids.get(device_index).copied().ok_or_else(|| {
            not_found(format!(
                "device index {device_index} out of range ({} found)",
                device_ids.len()
            ))
        })?;

        let device = Device::new(device_id);
        let device_name = device.name().unwrap_or_default();
        log::info!("selected OpenCL device: {device_name} ({platform_name})");

        Ok(Self {
            platform,
            device,
            platform_name,
            device_name,
        })
    }

    /// The raw device handle.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The parent platform.
    pub fn platform(&self) -> &Platform {
        &self.platform
    }
}

/// Wraps an OpenCL error, classifying fatality by its error code.
pub(crate) fn device_error(err: ClError, operation: &str) -> ServerError {
    ServerError::Device {
        code: err.0,
        message: format!("{operation}: {err}"),
        fatal: fatal_code(err.0),
    }
}

fn not_found(message: String) -> ServerError {
    ServerError::Device {
        code: CL_DEVICE_NOT_FOUND,
        message,
        fatal: true,
    }
}

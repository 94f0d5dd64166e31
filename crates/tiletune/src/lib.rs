//! Umbrella crate for the tiletune transpose autotuner.

pub use tiletune_common::*;
pub use tiletune_kernel::*;
pub use tiletune_runtime::*;

#[cfg(feature = "opencl")]
pub use tiletune_opencl as opencl;

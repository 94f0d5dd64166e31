use tiletune_kernel::WorkSize;

use crate::ServerError;

/// Access declaration for a device buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferAccess {
    /// The kernel only reads the buffer.
    ReadOnly,
    /// The kernel only writes the buffer.
    WriteOnly,
}

/// The device boundary the tuner drives.
///
/// One implementation wraps a real accelerator runtime;
/// [`CpuServer`](crate::CpuServer) implements it on host memory. All
/// operations are
/// synchronous: [`launch`](ComputeServer::launch) returns only after the
/// device has finished, which makes it the single suspension point of the
/// driver loop and lets the caller time a dispatch end to end.
pub trait ComputeServer {
    /// Handle to a compiled, executable kernel.
    type Kernel;
    /// Handle to a device buffer.
    type Buffer;

    /// Builds the kernel source and returns the executable entry point
    /// `name`, or the backend's compilation error.
    fn compile(
        &mut self,
        name: &str,
        source: &str,
        options: &str,
    ) -> Result<Self::Kernel, ServerError>;

    /// Allocates a device buffer of `bytes` with the given access
    /// declaration.
    fn create_buffer(
        &mut self,
        bytes: usize,
        access: BufferAccess,
    ) -> Result<Self::Buffer, ServerError>;

    /// Copies host data into a device buffer (blocking).
    fn write_buffer(&mut self, buffer: &mut Self::Buffer, data: &[u8]) -> Result<(), ServerError>;

    /// Copies a device buffer back to host memory (blocking).
    fn read_buffer(&mut self, buffer: &Self::Buffer, out: &mut [u8]) -> Result<(), ServerError>;

    /// Enqueues one dispatch of `kernel` over `work` and waits for device
    /// completion.
    fn launch(
        &mut self,
        kernel: &Self::Kernel,
        work: &WorkSize,
        input: &Self::Buffer,
        output: &mut Self::Buffer,
    ) -> Result<(), ServerError>;
}

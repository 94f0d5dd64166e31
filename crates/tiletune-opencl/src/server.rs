use std::ptr;

use opencl3::command_queue::{CommandQueue, CL_QUEUE_PROFILING_ENABLE};
use opencl3::context::Context;
use opencl3::error_codes::{CL_INVALID_COMMAND_QUEUE, CL_INVALID_CONTEXT};
use opencl3::kernel::{ExecuteKernel, Kernel};
use opencl3::memory::{Buffer, CL_MEM_READ_ONLY, CL_MEM_WRITE_ONLY};
use opencl3::program::Program;
use opencl3::types::CL_BLOCKING;
use tiletune_kernel::WorkSize;
use tiletune_runtime::{BufferAccess, ComputeServer, ServerError};

use crate::{device_error, OpenClDevice};

/// Whether an OpenCL error code means the context or queue is unusable.
///
/// Everything else is treated as recoverable for the current candidate
/// only.
pub fn fatal_code(code: i32) -> bool {
    matches!(code, CL_INVALID_CONTEXT | CL_INVALID_COMMAND_QUEUE)
}

/// OpenCL implementation of [`ComputeServer`].
///
/// Owns one context and one in-order command queue on the selected
/// device. All transfers are blocking, and every launch waits on its
/// completion event before returning, so candidates never overlap.
pub struct OpenClServer {
    device: OpenClDevice,
    context: Context,
    queue: CommandQueue,
}

impl OpenClServer {
    /// Creates a context and command queue on the given device.
    pub fn new(device: OpenClDevice) -> Result<Self, ServerError> {
        let context = Context::from_device(device.device())
            .map_err(|e| device_error(e, "context creation"))?;
        let queue = CommandQueue::create_default(&context, CL_QUEUE_PROFILING_ENABLE)
            .map_err(|e| device_error(e, "command queue creation"))?;
        Ok(Self {
            device,
            context,
            queue,
        })
    }

    /// The device this server runs on.
    pub fn device(&self) -> &OpenClDevice {
        &self.device
    }
}

impl ComputeServer for OpenClServer {
    type Kernel = Kernel;
    type Buffer = Buffer<u8>;

    fn compile(
        &mut self,
        name: &str,
        source: &str,
        options: &str,
    ) -> Result<Self::Kernel, ServerError> {
        let program = Program::create_and_build_from_source(&self.context, source, options)
            .map_err(|build_log| ServerError::Compile { log: build_log })?;
        Kernel::create(&program, name).map_err(|e| device_error(e, "kernel creation"))
    }

    fn create_buffer(
        &mut self,
        bytes: usize,
        access: BufferAccess,
    ) -> Result<Self::Buffer, ServerError> {
        let flags = match access {
            BufferAccess::ReadOnly => CL_MEM_READ_ONLY,
            BufferAccess::WriteOnly => CL_MEM_WRITE_ONLY,
        };
        unsafe {
            Buffer::<u8>::create(&self.context, flags, bytes, ptr::null_mut())
                .map_err(|e| device_error(e, "buffer allocation"))
        }
    }

    fn write_buffer(&mut self, buffer: &mut Self::Buffer, data: &[u8]) -> Result<(), ServerError> {
        unsafe {
            self.queue
                .enqueue_write_buffer(buffer, CL_BLOCKING, 0, data, &[])
                .map_err(|e| device_error(e, "host to device copy"))?;
        }
        Ok(())
    }

    fn read_buffer(&mut self, buffer: &Self::Buffer, out: &mut [u8]) -> Result<(), ServerError> {
        unsafe {
            self.queue
                .enqueue_read_buffer(buffer, CL_BLOCKING, 0, out, &[])
                .map_err(|e| device_error(e, "device to host copy"))?;
        }
        Ok(())
    }

    fn launch(
        &mut self,
        kernel: &Self::Kernel,
        work: &WorkSize,
        input: &Self::Buffer,
        output: &mut Self::Buffer,
    ) -> Result<(), ServerError> {
        let event = unsafe {
            ExecuteKernel::new(kernel)
                .set_arg(input)
                .set_arg(&*output)
                .set_global_work_sizes(&work.global)
                .set_local_work_sizes(&work.local)
                .enqueue_nd_range(&self.queue)
                .map_err(|e| device_error(e, "kernel enqueue"))?
        };
        event
            .wait()
            .map_err(|e| device_error(e, "device completion wait"))
    }
}

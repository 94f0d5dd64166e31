use derive_new::new;
use tiletune_common::pad;
use tiletune_kernel::WorkSize;

use crate::{BufferAccess, ComputeServer, ServerError};

/// Host implementation of [`ComputeServer`].
///
/// Executes the transpose contract directly on host memory instead of
/// interpreting kernel text, so the tile configuration only shapes the
/// launch geometry it validates. This is the non-accelerated execution
/// path and the test double for the driver loop.
#[derive(Debug, new)]
pub struct CpuServer {
    m: usize,
    n: usize,
    padding: usize,
    elem_size: usize,
}

/// Compiled-kernel handle of [`CpuServer`].
#[derive(Debug)]
pub struct CpuKernel {
    name: String,
}

/// Buffer handle of [`CpuServer`]: plain host bytes.
#[derive(Debug)]
pub struct CpuBuffer {
    data: Vec<u8>,
    #[allow(dead_code)]
    access: BufferAccess,
}

impl CpuBuffer {
    /// The buffer contents.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

impl ComputeServer for CpuServer {
    type Kernel = CpuKernel;
    type Buffer = CpuBuffer;

    fn compile(
        &mut self,
        name: &str,
        source: &str,
        _options: &str,
    ) -> Result<Self::Kernel, ServerError> {
        if source.is_empty() {
            return Err(ServerError::Compile {
                log: "empty kernel source".into(),
            });
        }
        if !source.contains(&format!("__kernel void {name}")) {
            return Err(ServerError::Compile {
                log: format!("entry point `{name}` not found in source"),
            });
        }
        Ok(CpuKernel { name: name.into() })
    }

    fn create_buffer(
        &mut self,
        bytes: usize,
        access: BufferAccess,
    ) -> Result<Self::Buffer, ServerError> {
        Ok(CpuBuffer {
            data: vec![0u8; bytes],
            access,
        })
    }

    fn write_buffer(&mut self, buffer: &mut Self::Buffer, data: &[u8]) -> Result<(), ServerError> {
        if data.len() > buffer.data.len() {
            return Err(ServerError::Device {
                code: 0,
                message: format!(
                    "write of {} bytes into buffer of {}",
                    data.len(),
                    buffer.data.len()
                ),
                fatal: false,
            });
        }
        buffer.data[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(&mut self, buffer: &Self::Buffer, out: &mut [u8]) -> Result<(), ServerError> {
        if out.len() > buffer.data.len() {
            return Err(ServerError::Device {
                code: 0,
                message: format!(
                    "read of {} bytes from buffer of {}",
                    out.len(),
                    buffer.data.len()
                ),
                fatal: false,
            });
        }
        out.copy_from_slice(&buffer.data[..out.len()]);
        Ok(())
    }

    fn launch(
        &mut self,
        kernel: &Self::Kernel,
        work: &WorkSize,
        input: &Self::Buffer,
        output: &mut Self::Buffer,
    ) -> Result<(), ServerError> {
        let tile = work.local[0];
        if tile == 0 || work.global[0] % tile != 0 {
            return Err(ServerError::Device {
                code: 0,
                message: format!(
                    "invalid work size for `{}`: global {:?}, local {:?}",
                    kernel.name, work.global, work.local
                ),
                fatal: false,
            });
        }

        let es = self.elem_size;
        let padded_n = pad(self.n, self.padding);
        let padded_m = pad(self.m, self.padding);
        if input.data.len() < self.m * padded_n * es || output.data.len() < self.n * padded_m * es {
            return Err(ServerError::Device {
                code: 0,
                message: "buffer too small for problem shape".into(),
                fatal: false,
            });
        }

        for i in 0..self.m {
            for j in 0..self.n {
                let src = ((i * padded_n) + j) * es;
                let dst = ((j * padded_m) + i) * es;
                output.data[dst..dst + es].copy_from_slice(&input.data[src..src + es]);
            }
        }
        Ok(())
    }
}

#![warn(missing_docs)]

//! Kernel-source generation and host transpose paths.
//!
//! The generator maps one tuning configuration and a fixed problem shape to
//! the OpenCL C text of a tiled transpose kernel that stages a square block
//! in local memory, transposes it in place with a cyclic rotation, and
//! writes it back through the padded output stride. The host paths (the
//! sequential reference and the AVX variant) share the same padded layout
//! and serve as the correctness oracle for every generated variant.

mod conf;
mod elem;
mod reference;
mod simd;
mod source;

pub use conf::*;
pub use elem::*;
pub use reference::*;
pub use simd::*;
pub use source::*;

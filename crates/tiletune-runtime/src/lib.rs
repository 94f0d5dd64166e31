#![warn(missing_docs)]

//! Backend-agnostic autotuning runtime.
//!
//! The [`ComputeServer`] trait is the whole device boundary: compile kernel
//! text, own buffers, launch with a blocking completion wait. The
//! [`sweep`] driver enumerates tile candidates for one problem size, times
//! each compiled variant, and selects the configuration with the best mean
//! throughput. Results can be persisted to and recalled from a
//! [`ConfTable`].

mod config;
mod cpu;
mod error;
mod report;
mod server;
mod table;
mod tuner;

pub use config::*;
pub use cpu::*;
pub use error::*;
pub use report::*;
pub use server::*;
pub use table::*;
pub use tuner::*;

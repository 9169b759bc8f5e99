//! Readings of processor and memory utilization
pub mod interface;
#[cfg(test)]
pub mod mock;
pub mod sysinfo_reader;

pub use interface::*;

//! Control-layer logic deciding when the machine gets shut down

pub mod idle_monitor;
pub mod session;

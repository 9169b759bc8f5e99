//! Actors and building blocks facing the host system

pub mod sampler;
pub mod shutdown_effector;

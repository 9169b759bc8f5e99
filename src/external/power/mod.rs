//! Turning the machine off
pub mod command;
pub mod dry_run;
pub mod interface;
pub mod logind;

pub use interface::*;

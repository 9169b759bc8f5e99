//! A small framework for running parts of the program as Tokio tasks which
//! communicate only through channels.

mod ports;
mod server;

#[doc(inline)]
pub use ports::*;

#[doc(inline)]
pub use server::*;

#[cfg(test)]
mod test_ports;

#[cfg(test)]
mod test_server;

//! Network Module
//!
//! TCP server for the line protocol.
//!
//! ## Architecture
//! - Main thread accepts connections
//! - Worker thread pool handles client I/O, one client per worker at a time
//! - Shared Engine reference for all workers

mod connection;
mod server;

pub use connection::Connection;
pub use server::{Server, ShutdownHandle};

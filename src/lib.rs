//! navtask command line and HTTP surface.
//!
//! The binary wires configuration, logging and authentication around the
//! task orchestrator in `navtask-kernel`.

pub mod cli;
pub mod server;

//! Local command endpoint
//!
//! Newline-delimited JSON over a Unix Domain Socket. `pg serve` hosts the
//! orchestrator behind it; `pg send`, `pg ping` and `pg stop` talk to it.

use std::path::PathBuf;

pub mod client;
pub mod listener;
pub mod messages;

pub use client::ProtogenClient;
pub use listener::{cleanup_socket, create_listener_at, serve};
pub use messages::{Request, Response};

/// Default socket path for the command endpoint
pub fn get_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("protogen")
        .join("protogen.sock")
}

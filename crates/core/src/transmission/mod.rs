//! Torrent-control abstraction.
//!
//! This module provides a `TorrentControl` trait for the operations the
//! conversation engine needs, plus the Transmission RPC implementation.

mod rpc;
mod types;

pub use rpc::TransmissionClient;
pub use types::*;

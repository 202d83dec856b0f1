//! Model Context Protocol message shaping
//!
//! Provides JSON-RPC response normalization and the methods answered without contacting the remote server.

pub mod local;
pub mod rpc;

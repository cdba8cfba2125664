//! HTTP API module.
//!
//! This module provides the HTTP server, API types and job log stream.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{app, start_server};
pub use types::*;

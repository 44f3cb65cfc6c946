//! Model Context Protocol server exposing the conversion and publishing tools.

pub mod jsonrpc;
pub mod server;
pub mod tools;

pub use server::{handle_request, serve, serve_stdio};

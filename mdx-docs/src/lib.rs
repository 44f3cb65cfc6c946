pub mod cli;
pub mod gemini;
pub mod github;
pub mod load_config;
pub mod mcp;
pub mod services;

pub use cli::{run, Cli, Commands};

pub mod chat;
pub mod cli;
pub mod github;
pub mod load_config;
pub mod notion;

pub use cli::{run, Cli, Commands};

pub mod cli;
pub mod load_config;
pub mod mongo;

pub use cli::{run, Cli, Commands};

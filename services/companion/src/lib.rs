pub mod config;
pub mod mic_adapter;
pub mod prompt_loader;
pub mod repl;

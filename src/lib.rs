pub mod config;
pub mod core;
pub mod history;
pub mod llm;
pub mod logging;
pub mod prompt;
pub mod rag;
pub mod server;
pub mod state;

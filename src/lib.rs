pub mod api;
pub mod chunker;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod parsers;
pub mod prompts;
pub mod response;
pub mod server;
pub mod summarize;

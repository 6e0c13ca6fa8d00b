//! CLI command handlers.

pub mod audit;
pub mod config;
pub mod render;

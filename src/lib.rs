pub mod app;
pub mod config;
pub mod mcp;
pub mod sampling;
pub mod shared;
pub mod verification;

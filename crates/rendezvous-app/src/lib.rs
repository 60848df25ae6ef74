pub mod app;
pub mod config;
pub mod engine_handler;
pub mod error;
pub mod middleware;

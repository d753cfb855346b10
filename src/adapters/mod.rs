pub mod api;
pub mod cache;
pub mod config;
pub mod memory;

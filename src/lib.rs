pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod sim;
pub mod store;

//! Infrastructure module - HTTP, configuration, persistence, parsing

pub mod config;
pub mod http_client;
pub mod logging;
pub mod parsing;
pub mod state_store;

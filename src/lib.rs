pub mod config;
pub mod error;
pub mod mcp;
pub mod models;
pub mod services;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

// ABOUTME: PostgreSQL utilities module
// ABOUTME: Exports connection management and catalog introspection

pub mod catalog;
pub mod connection;

pub use connection::{connect, connect_with, connect_with_retry, ConnectOptions};

// ABOUTME: Library module for pgvault
// ABOUTME: Exports the backup/restore engine for use in the binary and tests

pub mod commands;
pub mod config;
pub mod error;
pub mod migration;
pub mod postgres;
pub mod progress;
pub mod utils;

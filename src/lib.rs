// ABOUTME: Library module for postgres-snapshot-migrator
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod artifact;
pub mod commands;
pub mod config;
pub mod export;
pub mod import;
pub mod orchestrator;
pub mod postgres;
pub mod summary;
pub mod utils;

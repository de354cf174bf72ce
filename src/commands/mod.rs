// ABOUTME: Command implementations for each migration phase
// ABOUTME: Exports the export and import entry points

pub mod export;
pub mod import;

pub use export::export;
pub use import::import;

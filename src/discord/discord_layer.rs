// Discord layer - commands, the CDN uploader, and framework error handling.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "uploads/cdn_uploader.rs"]
pub mod uploads;

#[path = "errors/framework_errors.rs"]
pub mod errors;

// Re-export command types for convenience
pub use commands::{Context, Data, Error};

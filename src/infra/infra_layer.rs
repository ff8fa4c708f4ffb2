// Infra: concrete adapters behind the core ports (upstream API, HTTP image
// downloads, the SQLite URL cache) plus the daily log file writer.

#[path = "levels/wonderland_api_client.rs"]
pub mod levels;

#[path = "images/mod.rs"]
pub mod images;

#[path = "logging/daily_file_writer.rs"]
pub mod logging;

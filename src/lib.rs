// Shared infrastructure
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Domain
pub mod alert;
pub mod directory;
pub mod mail;
pub mod processor;
pub mod template;

// Application layer
pub mod api;
pub mod server;
pub mod triggers;

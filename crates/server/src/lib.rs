pub mod api;
pub mod app_factory;
pub mod chat;
pub mod config;
pub mod error;
pub mod telemetry;

pub mod api;
pub mod app;
pub mod config;
pub mod demographics;
pub mod entities;
pub mod metrics;
pub mod migrator;
pub mod telemetry;
pub mod uploads;

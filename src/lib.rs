pub mod constants;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod types;

// Layered boundaries: ports in app, adapters in infra
pub mod app;
pub mod infra;

// Domain data shapes shared across layers
pub mod domain;

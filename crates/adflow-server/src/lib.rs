//! adflow server - campaign workflow engine and REST API
//!
//! This crate hosts the campaign lifecycle engine, its persistence backends
//! and the HTTP surface advertisers, campaign managers and tech support use.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod routes;
pub mod store;

pub use config::ServerConfig;
pub use engine::{Engine, EngineSettings};
pub use error::AppError;
pub use routes::create_router;

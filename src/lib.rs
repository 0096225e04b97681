// ParentPick - parenting video discovery and community server

// Configuration and shared state
pub mod app_state;
pub mod config;

// Relational store and row models
pub mod database;
pub mod models;

// Domain rules - lifecycle gate, aggregation, ages and slugs
pub mod domains;

// Infrastructure - session credentials, middleware, outbound services
pub mod infrastructure;

// Business operations and the HTTP surface
pub mod routes;
pub mod services;

// Common utilities
pub mod data_seeder;
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};

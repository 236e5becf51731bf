// Infrastructure layer (shared components)
pub mod auth;
pub mod config;
pub mod db;
pub mod error;

// Domain layer (business logic)
pub mod domain;
pub mod events;
pub mod messaging;

// Application layer
pub mod api;
pub mod server;

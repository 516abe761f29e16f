pub mod config;
pub mod error;
pub mod store;

// Client pipeline
pub mod pipeline;

// Upload endpoint + admin listing
pub mod api;
pub mod auth;

//! Domain core for the Coursehub backend.
//!
//! Holds the document models, the store abstraction and its implementations,
//! session/password handling, and the services behind every HTTP operation.

pub mod access;
pub mod analytics;
pub mod auth;
pub mod document;
pub mod models;
pub mod services;
pub mod store;

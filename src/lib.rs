//! Contact-management REST backend.
//!
//! Authenticated users keep personal contact records; admins and moderators
//! may additionally list every user's contacts. See [`server::router`] for
//! the HTTP surface and [`repository::ContactStore`] for persistence.

pub mod auth;
pub mod config;
pub mod entity;
pub mod error;
pub mod extract;
pub mod repository;
pub mod routes;
pub mod schema;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use server::{router, AppState};

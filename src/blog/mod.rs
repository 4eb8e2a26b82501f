//! # Blog Module
//!
//! Posts are appended to and listed from a single JSON array object in the
//! object store. Both routes require a bearer token; `title` and `post` are
//! taken as sent, empty strings included.

pub mod handlers;
pub mod models;
pub mod routes;

#[cfg(test)]
mod tests;

pub use routes::blog_routes;

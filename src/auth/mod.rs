//! # Auth Module
//!
//! Account endpoints backed by the external identity provider:
//! - signup / signin / password change, each answering with a custom token
//! - bearer-token inspection (`get_claims`, admin greeting)
//! - `AuthedUser` extractor used by every protected route

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod validators;


pub use extractors::AuthedUser;
pub use routes::auth_routes;

//! Account routes

use axum::{routing::post, Router};

use super::handlers;

/// Creates and returns the account router
///
/// # Routes
/// - `POST /user/signup` - Create an account, returns a custom token
/// - `POST /user/signin` - Check credentials, returns a custom token
/// - `POST /user/changepassword` - Replace the password, returns a custom token
/// - `POST /user/get_claims` - Profile and user id of the bearer
/// - `POST /user/polite_if_you_are_admin` - Greets admins, turns everyone else away
pub fn auth_routes() -> Router {
    Router::new()
        .route("/user/signup", post(handlers::signup))
        .route("/user/signin", post(handlers::signin))
        .route("/user/changepassword", post(handlers::change_password))
        .route("/user/get_claims", post(handlers::get_claims))
        .route(
            "/user/polite_if_you_are_admin",
            post(handlers::polite_if_you_are_admin),
        )
}

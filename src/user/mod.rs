use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/register", post(handlers::register))
        .route("/user/login", post(handlers::login))
        .route("/user/logout", get(handlers::logout))
        .route("/user/me", get(handlers::get_me))
        .route("/user/update/me", put(handlers::update_profile))
        .route("/user/update/password", put(handlers::update_password))
        .route("/user/me/portfolio", get(handlers::portfolio_user))
        .route("/user/password/forget", post(handlers::forgot_password))
        .route("/user/password/reset/:token", post(handlers::reset_password))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
}

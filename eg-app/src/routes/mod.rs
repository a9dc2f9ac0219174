pub mod auth;
pub mod evaluate;
pub mod health;
pub mod questions;
pub mod sentences;
pub mod submissions;

use axum::Router;

pub fn router() -> Router {
    Router::new()
        .merge(health::router())
        .merge(evaluate::router())
        .merge(questions::router())
        .merge(submissions::router())
        .merge(sentences::router())
        .merge(auth::router())
}

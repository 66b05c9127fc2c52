use axum::Router;

pub mod cars;
pub mod dealers;
pub mod system;

/// Router for the entity CRUD endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/api/cars", cars::router())
        .nest("/api/dealers", dealers::router())
}

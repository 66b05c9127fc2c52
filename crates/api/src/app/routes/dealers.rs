use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use dealership_core::DealerId;
use dealership_inventory::DealerInput;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_dealers).post(create_dealer))
        .route("/:id", get(get_dealer).put(update_dealer).delete(delete_dealer))
}

pub async fn list_dealers(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.dispatcher().list_dealers().await {
        Ok(dealers) => Json(dealers).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn get_dealer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: DealerId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.dispatcher().get_dealer(id).await {
        Ok(dealer) => Json(dealer).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn create_dealer(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<DealerInput>, JsonRejection>,
) -> axum::response::Response {
    let input = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.dispatcher().create_dealer(input).await {
        Ok(dealer) => (StatusCode::CREATED, Json(dealer)).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn update_dealer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<DealerInput>, JsonRejection>,
) -> axum::response::Response {
    let id: DealerId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let input = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.dispatcher().update_dealer(id, input).await {
        Ok(dealer) => Json(dealer).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

/// Deletes the dealer and, through the foreign key cascade, every car it owns.
/// The removed cars are not announced on the event exchange.
pub async fn delete_dealer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: DealerId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.dispatcher().delete_dealer(id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use dealership_core::CarId;
use dealership_inventory::CarInput;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_cars).post(create_car))
        .route("/:id", get(get_car).put(update_car).delete(delete_car))
}

pub async fn list_cars(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.dispatcher().list_cars().await {
        Ok(cars) => Json(cars).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn get_car(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CarId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.dispatcher().get_car(id).await {
        Ok(car) => Json(car).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn create_car(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<CarInput>, JsonRejection>,
) -> axum::response::Response {
    let input = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.dispatcher().create_car(input).await {
        Ok(car) => (StatusCode::CREATED, Json(car)).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn update_car(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<CarInput>, JsonRejection>,
) -> axum::response::Response {
    let id: CarId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let input = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.dispatcher().update_car(id, input).await {
        Ok(car) => Json(car).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn delete_car(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CarId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.dispatcher().delete_car(id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

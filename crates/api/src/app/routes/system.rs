use std::sync::Arc;

use axum::{Json, extract::Extension, response::IntoResponse};

use crate::app::services::AppServices;

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "pool": services.pool_stats(),
        "publisher": {
            "enabled": services.dispatcher().publisher_enabled(),
            "stats": services.publisher_stats(),
        },
    }))
}

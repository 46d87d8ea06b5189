use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use jitney_catalog::MenuItem;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/menu", get(list_menu))
        .route("/v1/menu/items", put(upsert_item))
}

async fn list_menu(State(state): State<AppState>) -> Result<Json<Vec<MenuItem>>, ApiError> {
    let items = state
        .menu
        .list_items()
        .await
        .map_err(|err| anyhow::anyhow!(err))?;
    Ok(Json(items))
}

async fn upsert_item(
    State(state): State<AppState>,
    Json(item): Json<MenuItem>,
) -> Result<Json<MenuItem>, ApiError> {
    state
        .menu
        .upsert_item(&item)
        .await
        .map_err(|err| anyhow::anyhow!(err))?;
    Ok(Json(item))
}

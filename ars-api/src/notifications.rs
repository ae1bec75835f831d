use axum::{extract::State, routing::get, Json, Router};
use ars_core::{CoreError, Notification};

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/notifications", get(list_notifications))
}

/// Messages sent to the caller's address.
async fn list_notifications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Notification>>, AppError> {
    let user_id = user.require()?;
    let account = state
        .stores
        .users
        .get_user(user_id)
        .await?
        .ok_or_else(|| CoreError::not_found("User", user_id))?;
    Ok(Json(state.outbox.sent_to(account.email.expose()).await))
}

//! Order lookup for the checkout success page.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use crate::db::orders::{OrderDetails, OrderRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Fetch the persisted order for a payment session.
///
/// Returns 404 until the payment webhook has been processed; the success
/// page polls this briefly after redirect.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<OrderDetails>> {
    let order = OrderRepository::new(state.pool())
        .get_by_session_id(&session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order for session {session_id}")))?;

    Ok(Json(order))
}

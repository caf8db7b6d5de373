//! External tool status.

use axum::extract::State;
use axum::Json;

use lf_av::ToolInfo;

use crate::context::AppContext;
use crate::error::AppError;

/// GET /api/tools
pub async fn list_tools(State(ctx): State<AppContext>) -> Result<Json<Vec<ToolInfo>>, AppError> {
    // Version detection spawns processes synchronously.
    let tools = ctx.tools.clone();
    let infos = tokio::task::spawn_blocking(move || tools.check_all())
        .await
        .map_err(|e| lf_core::Error::Internal(format!("tool check panicked: {e}")))?;
    Ok(Json(infos))
}

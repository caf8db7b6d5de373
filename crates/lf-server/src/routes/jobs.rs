//! Job status route handlers.

use axum::extract::{Path, State};
use axum::Json;

use lf_core::JobId;
use lf_orchestrator::JobRecord;

use crate::context::AppContext;
use crate::error::AppError;

/// GET /api/jobs
pub async fn list_jobs(State(ctx): State<AppContext>) -> Json<Vec<JobRecord>> {
    Json(ctx.tracker.list())
}

/// GET /api/jobs/{id}
pub async fn get_job(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<JobRecord>, AppError> {
    let job_id = JobId::new(id.clone()).map_err(|_| lf_core::Error::not_found("job", &id))?;
    let record = ctx
        .tracker
        .get(&job_id)
        .ok_or_else(|| lf_core::Error::not_found("job", &id))?;
    Ok(Json(record))
}

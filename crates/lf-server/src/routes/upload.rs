//! Upload gateway.
//!
//! `POST /upload` takes one video under the `videofile` multipart field,
//! stores it as `<upload_dir>/<unix-millis>-<name>`, and queues a job whose id
//! is the stored file's stem.

use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use lf_core::{Error, Job};

use crate::context::AppContext;
use crate::error::AppError;

/// Multipart field carrying the video.
pub const UPLOAD_FIELD: &str = "videofile";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub video_id: String,
}

/// POST /upload
pub async fn upload_video(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let is_video = field
            .content_type()
            .is_some_and(|ct| ct.starts_with("video/"));
        if !is_video {
            return Err(Error::Validation("Only video files are allowed!".into()).into());
        }

        let file_name = stored_file_name(
            chrono::Utc::now().timestamp_millis(),
            field.file_name().unwrap_or(""),
        );
        let path = upload_path(&ctx.config.storage.upload_dir, &file_name);
        let job = Job::from_source(&path)?;

        // Only a file this request created is removed on a later failure.
        store_field(field, &path).await?;
        tracing::info!(job_id = %job.id, path = %path.display(), "Upload stored");

        let video_id = job.id.to_string();
        if let Err(e) =
            lf_orchestrator::submit(ctx.queue.as_ref(), &ctx.tracker, &ctx.event_bus, job).await
        {
            remove_quietly(&path).await;
            return Err(e.into());
        }

        return Ok((
            StatusCode::ACCEPTED,
            Json(UploadResponse {
                message: "Video uploaded and queued for transcoding".into(),
                video_id,
            }),
        ));
    }

    Err(Error::Validation("No file uploaded".into()).into())
}

/// Create `path` for a new upload. An existing file belongs to another job
/// and is never truncated.
pub async fn create_upload_file(path: &Path) -> lf_core::Result<tokio::fs::File> {
    tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => Error::Conflict(format!(
                "an upload named {} is already stored",
                path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
            )),
            _ => Error::storage(path, e),
        })
}

/// Stream a multipart field to `path`, removing the partial file on error.
async fn store_field(mut field: Field<'_>, path: &Path) -> lf_core::Result<()> {
    let mut file = create_upload_file(path).await?;

    let result: lf_core::Result<()> = async {
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| Error::Validation(format!("upload interrupted: {e}")))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::storage(path, e))?;
        }
        file.flush().await.map_err(|e| Error::storage(path, e))
    }
    .await;

    if result.is_err() {
        drop(file);
        remove_quietly(path).await;
    }
    result
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!("Failed to remove {}: {e}", path.display());
    }
}

/// `<millis>-<sanitized name>`, keeping only the final path component and
/// characters safe in a file name.
pub fn stored_file_name(millis: i64, original: &str) -> String {
    let base = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let mut clean: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = clean.trim_start_matches('.');
    if trimmed.is_empty() {
        clean = "upload".to_string();
    } else if trimmed.len() != clean.len() {
        clean = trimmed.to_string();
    }

    format!("{millis}-{clean}")
}

/// Upload directory path for a stored name.
pub fn upload_path(upload_dir: &Path, stored_name: &str) -> PathBuf {
    upload_dir.join(stored_name)
}

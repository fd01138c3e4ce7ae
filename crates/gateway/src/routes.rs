use crate::state::AppState;
use axum::{
    Json,
    body::Bytes,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use inference::Prediction;
use serde::Serialize;

pub const MSG_SUCCESS: &str = "Successfully evaluated image.";
pub const MSG_FILE_MISSING: &str = "File missing.";
pub const MSG_FILE_TOO_LARGE: &str = "File too large.";
pub const MSG_MODEL_UNAVAILABLE: &str = "Model failed load.";
pub const MSG_INTERNAL_ERROR: &str = "Internal error.";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub message: &'static str,
}

/// Envelope for every `/evaluate` reply. `result` is only set on success.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub message: &'static str,
    pub status: u16,
    pub result: Option<Prediction>,
}

type ApiReply = (StatusCode, Json<ApiResponse>);

fn reply(status: StatusCode, message: &'static str, result: Option<Prediction>) -> ApiReply {
    (
        status,
        Json(ApiResponse {
            message,
            status: status.as_u16(),
            result,
        }),
    )
}

/// GET / - liveness check
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "Server is working.",
    })
}

/// POST /evaluate - classify one uploaded test image
///
/// Expects a multipart body with the image under the configured field
/// (`image` by default). Any failure after the upload is read is reported
/// as an opaque 500; details only go to the log.
pub async fn evaluate(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiReply {
    let upload = match multipart {
        Ok(multipart) => read_upload(multipart, &state.upload_field).await,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Request is not multipart");
            Ok(None)
        }
    };

    let upload = match upload {
        Ok(Some(upload)) => upload,
        Ok(None) => return reply(StatusCode::BAD_REQUEST, MSG_FILE_MISSING, None),
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            tracing::warn!(error = %e, "Upload exceeds size limit");
            return reply(StatusCode::PAYLOAD_TOO_LARGE, MSG_FILE_TOO_LARGE, None);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Malformed multipart body");
            return reply(StatusCode::BAD_REQUEST, MSG_FILE_MISSING, None);
        }
    };

    let Some(pipeline) = state.pipeline.clone() else {
        tracing::error!("Evaluation requested but no model is loaded");
        return reply(StatusCode::INTERNAL_SERVER_ERROR, MSG_MODEL_UNAVAILABLE, None);
    };

    let upload_bytes = upload.len();
    match tokio::task::spawn_blocking(move || pipeline.run(&upload)).await {
        Ok(Ok(prediction)) => {
            tracing::info!(
                upload_bytes,
                positive = prediction.positive(),
                scores = ?prediction.data(),
                "Evaluated image"
            );
            reply(StatusCode::OK, MSG_SUCCESS, Some(prediction))
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, kind = e.kind(), upload_bytes, "Failed to evaluate image");
            reply(StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL_ERROR, None)
        }
        Err(e) => {
            tracing::error!(error = %e, "Evaluation task panicked or was cancelled");
            reply(StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL_ERROR, None)
        }
    }
}

/// Returns the first field named `field_name`, skipping any others.
async fn read_upload(
    mut multipart: Multipart,
    field_name: &str,
) -> Result<Option<Bytes>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(field_name) {
            return field.bytes().await.map(Some);
        }
    }
    Ok(None)
}

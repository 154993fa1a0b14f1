use crate::AppState;
use crate::jobs::{FORGOT_PASSWORD_JOB, spawn_forgot_password};
use crate::notifier::PasswordResetRequest;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

#[derive(Serialize, Debug)]
pub struct JobAccepted {
    job: &'static str,
    job_id: Uuid,
}

#[instrument(
    name = "scheduling forgot password job",
    skip(app_state, request),
    fields(recipient = %request.email)
)]
pub async fn schedule(
    State(app_state): State<AppState>,
    Json(request): Json<PasswordResetRequest>,
) -> (StatusCode, Json<JobAccepted>) {
    let (job_id, _detached) = spawn_forgot_password(app_state.notifier.clone(), request);
    tracing::info!(%job_id, "forgot password job scheduled");
    (
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            job: FORGOT_PASSWORD_JOB,
            job_id,
        }),
    )
}

use crate::errors::DeliveryError;
use crate::notifier::{PasswordResetNotifier, PasswordResetRequest};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Instrument, info_span};
use uuid::Uuid;

pub const FORGOT_PASSWORD_JOB: &str = "forgot_password";

/// Runs the forgot-password job on the runtime and returns its id.
///
/// Dropping the handle detaches the job.
pub fn spawn_forgot_password(
    notifier: Arc<PasswordResetNotifier>,
    request: PasswordResetRequest,
) -> (Uuid, JoinHandle<Result<(), DeliveryError>>) {
    let job_id = Uuid::new_v4();
    let span = info_span!("job", job = FORGOT_PASSWORD_JOB, %job_id);
    let handle = tokio::spawn(async move { notifier.send(&request).await }.instrument(span));
    (job_id, handle)
}

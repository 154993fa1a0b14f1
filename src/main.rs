use forgot_password_mailer::errors;
use forgot_password_mailer::run;

#[tokio::main]
async fn main() -> Result<(), errors::AppError> {
    run().await
}

pub mod forgot_password;
pub mod health_check;

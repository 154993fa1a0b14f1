use axum::extract::Path;
use axum::http::StatusCode;

pub async fn health(Path(name): Path<String>) -> (StatusCode, String) {
    (StatusCode::OK, format!("hello {name}"))
}

use axum::{
    http::StatusCode,
    response::{
        IntoResponse,
        Response,
    },
};
use exporter_merger::SerializeError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Writing the merged metrics failed: {0}")]
    Serialize(#[from] SerializeError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("{self}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

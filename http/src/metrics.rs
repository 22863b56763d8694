use crate::{
    error::AppError,
    router::AppState,
};
use axum::{
    extract::State,
    http::{
        header,
        HeaderMap,
        Uri,
    },
    response::IntoResponse,
};
use exporter_merger::exposition::CONTENT_TYPE;

pub async fn handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    debug!(
        %uri,
        user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default(),
        "handling new request"
    );

    let document = state.merger.render().await?;
    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE)], document))
}

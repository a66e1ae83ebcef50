//! Download handler for rendered trailers.

use std::io::ErrorKind;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::error::{ApiError, ApiResult};
use crate::handlers::upload::sanitize_filename;
use crate::state::AppState;

/// A name is served only if sanitizing leaves it unchanged.
fn is_servable(filename: &str) -> bool {
    sanitize_filename(filename).as_deref() == Some(filename)
}

fn content_type(filename: &str) -> &'static str {
    if filename.ends_with(".mp4") {
        "video/mp4"
    } else {
        "application/octet-stream"
    }
}

/// `GET /download/:filename`: send a trailer from the output directory as an attachment.
pub async fn download(State(state): State<AppState>, Path(filename): Path<String>) -> ApiResult<Response> {
    if !is_servable(&filename) {
        return Err(ApiError::NotFound);
    }

    let path = state.config.output_dir.join(&filename);
    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(ApiError::NotFound),
        Err(e) => return Err(e.into()),
    };

    let headers = [
        (header::CONTENT_TYPE, content_type(&filename).to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
    ];
    Ok((headers, data).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_servable() {
        assert!(is_servable("trailer_ab12cd34_match.mp4"));
        assert!(!is_servable("../secret.mp4"));
        assert!(!is_servable(".env"));
        assert!(!is_servable("a b.mp4"));
        assert!(!is_servable(""));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("trailer_x.mp4"), "video/mp4");
        assert_eq!(content_type("notes.txt"), "application/octet-stream");
    }
}

use crate::errors::{ApiError, ServiceError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    ApiError::ServiceError(err)
}

/// `Content-Disposition` value for a download named `stem.extension`
pub fn attachment_disposition(stem: &str, extension: &str) -> String {
    let stem: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("attachment; filename=\"{}.{}\"", stem, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_filename_is_sanitized() {
        assert_eq!(
            attachment_disposition("M3x12 SHCS/\"x\"_BOM", "csv"),
            "attachment; filename=\"M3x12_SHCS__x__BOM.csv\""
        );
    }
}

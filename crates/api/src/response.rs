//! API response helpers.

use axum::{
    Json,
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// 201 with a JSON body.
pub fn created<T: Serialize>(body: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(body))
}

/// Empty success response.
#[must_use]
pub const fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// A downloadable file.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Suggested file name.
    pub filename: &'static str,
    /// MIME type.
    pub content_type: &'static str,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// A PDF document.
    #[must_use]
    pub const fn pdf(filename: &'static str, bytes: Vec<u8>) -> Self {
        Self {
            filename,
            content_type: "application/pdf",
            bytes,
        }
    }
}

impl IntoResponse for Attachment {
    fn into_response(self) -> Response {
        let disposition = format!("attachment; filename=\"{}\"", self.filename);
        let mut response = self.bytes.into_response();
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(self.content_type));
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            headers.insert(CONTENT_DISPOSITION, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_headers() {
        let response = Attachment::pdf("shopping_list.pdf", b"%PDF".to_vec()).into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"shopping_list.pdf\""
        );
    }
}

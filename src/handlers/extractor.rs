//! JSON extractor with plain-text rejections
//!
//! Wraps Axum's `Json` extractor so malformed bodies are answered the same
//! way as validation failures: a bare text message, not Axum's defaults.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

/// Rejection produced by [`RelayJson`]
///
/// - Missing content type → 415 Unsupported Media Type
/// - Everything else (syntax, data, body errors) → 400 Bad Request
#[derive(Debug)]
pub struct RelayJsonRejection(JsonRejection);

impl RelayJsonRejection {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for RelayJsonRejection {
    fn into_response(self) -> Response {
        let message = match &self.0 {
            JsonRejection::MissingJsonContentType(_) => {
                "Content-Type must be application/json".to_string()
            }
            other => other.body_text(),
        };
        tracing::debug!(status = %self.status(), rejection = %message, "Rejected request body");
        (self.status(), message).into_response()
    }
}

/// JSON body extractor used by relay handlers
pub struct RelayJson<T>(pub T);

impl<S, T> FromRequest<S> for RelayJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = RelayJsonRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(RelayJson(value)),
            Err(rejection) => Err(RelayJsonRejection(rejection)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, routing::post};
    use tower::ServiceExt;

    #[derive(serde::Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        value: u32,
    }

    async fn echo(RelayJson(_): RelayJson<Payload>) -> StatusCode {
        StatusCode::OK
    }

    async fn send(content_type: Option<&str>, body: &'static str) -> (StatusCode, String) {
        let app = Router::new().route("/", post(echo));
        let mut builder = axum::http::Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        let response = app
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let (status, _) = send(Some("application/json"), r#"{"value": 1}"#).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_syntax_error_is_bad_request() {
        let (status, body) = send(Some("application/json"), r#"{"value": "#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.is_empty());
    }

    #[tokio::test]
    async fn test_type_mismatch_is_bad_request() {
        let (status, _) = send(Some("application/json"), r#"{"value": "one"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_content_type_is_unsupported_media_type() {
        let (status, body) = send(None, r#"{"value": 1}"#).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body, "Content-Type must be application/json");
    }
}

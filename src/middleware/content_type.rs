//! Content-Type 검증 미들웨어
//!
//! POST/PUT 요청은 JSON 또는 form-urlencoded 본문만 허용합니다.
//! 본문은 검사하지 않습니다.

use crate::error::GatewayError;
use super::{Flow, Middleware, Request, RequestContext};
use async_trait::async_trait;
use hyper::{header, Method, StatusCode};
use tracing::debug;

/// 허용되는 미디어 타입
pub const SUPPORTED_MEDIA_TYPES: [&str; 2] = ["application/json", "application/x-www-form-urlencoded"];

/// 검증 대상 메서드인지
fn requires_validation(method: &Method) -> bool {
    method == Method::POST || method == Method::PUT
}

/// Content-Type 값이 허용 목록 중 하나를 포함하는지
pub fn is_supported(content_type: &str) -> bool {
    let lowered = content_type.to_ascii_lowercase();
    SUPPORTED_MEDIA_TYPES.iter().any(|t| lowered.contains(t))
}

#[derive(Debug, Default)]
pub struct ContentTypeMiddleware;

impl ContentTypeMiddleware {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for ContentTypeMiddleware {
    fn name(&self) -> &'static str {
        "content-type"
    }

    async fn handle_request(&self, req: Request, _ctx: &mut RequestContext) -> Result<Flow, GatewayError> {
        if !requires_validation(req.method()) {
            return Ok(Flow::Continue(req));
        }

        match req.headers().get(header::CONTENT_TYPE) {
            None => Err(GatewayError::client(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Content-Type header is required",
            )),
            Some(value) => {
                let content_type = value.to_str().unwrap_or("");
                if is_supported(content_type) {
                    Ok(Flow::Continue(req))
                } else {
                    debug!(content_type, "Unsupported content type");
                    Err(GatewayError::client(
                        StatusCode::UNSUPPORTED_MEDIA_TYPE,
                        format!("Content type '{}' is not supported", content_type),
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Body;

    async fn run(method: Method, content_type: Option<&str>) -> Result<Flow, GatewayError> {
        let mut builder = hyper::Request::builder().method(method).uri("/api/v1/transfers");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        let req = builder.body(Body::default()).unwrap();
        let mut ctx = RequestContext::from_request(&req, None);
        ContentTypeMiddleware::new().handle_request(req, &mut ctx).await
    }

    #[test]
    fn test_is_supported() {
        assert!(is_supported("application/json"));
        assert!(is_supported("application/json; charset=UTF-8"));
        assert!(is_supported("Application/JSON"));
        assert!(is_supported("application/x-www-form-urlencoded"));
        assert!(!is_supported("text/plain"));
        assert!(!is_supported("multipart/form-data; boundary=x"));
    }

    #[tokio::test]
    async fn test_put_text_plain_rejected() {
        let err = run(Method::PUT, Some("text/plain")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_post_without_content_type_rejected() {
        let err = run(Method::POST, None).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_post_json_passes() {
        assert!(matches!(run(Method::POST, Some("application/json")).await, Ok(Flow::Continue(_))));
    }

    #[tokio::test]
    async fn test_other_methods_pass_unconditionally() {
        for method in [Method::GET, Method::DELETE, Method::PATCH, Method::OPTIONS] {
            assert!(matches!(run(method, Some("text/plain")).await, Ok(Flow::Continue(_))));
        }
    }
}

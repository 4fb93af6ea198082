use crate::error::GatewayError;
use crate::middleware::{Flow, Middleware, Request, RequestContext, Response};
use async_trait::async_trait;
use hyper::header::{HeaderName, HeaderValue};
use hyper::HeaderMap;

/// 고정 Content-Security-Policy 값
pub const CONTENT_SECURITY_POLICY: &str =
    "default-src 'self'; script-src 'self'; object-src 'none'; img-src 'self' data:; style-src 'self' 'unsafe-inline'; frame-ancestors 'none'";

/// 모든 응답에 추가되는 보안 헤더 (이름은 소문자)
pub const SECURITY_HEADERS: [(&str, &str); 8] = [
    // MIME 타입 스니핑 방지
    ("x-content-type-options", "nosniff"),
    // 클릭재킹 방지
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("content-security-policy", CONTENT_SECURITY_POLICY),
    // HTTPS 강제
    ("strict-transport-security", "max-age=31536000; includeSubDomains; preload"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    // 캐시 비활성화
    ("cache-control", "no-store, no-cache, must-revalidate, max-age=0"),
    ("pragma", "no-cache"),
];

/// 기본 보안 헤더를 설정합니다. 이미 설정된 헤더는 덮어쓰지 않습니다.
pub fn apply_security_headers(headers: &mut HeaderMap) {
    for (name, value) in SECURITY_HEADERS {
        headers
            .entry(HeaderName::from_static(name))
            .or_insert(HeaderValue::from_static(value));
    }
}

/// 보안 헤더 미들웨어
#[derive(Debug, Default)]
pub struct SecurityHeadersMiddleware;

impl SecurityHeadersMiddleware {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for SecurityHeadersMiddleware {
    fn name(&self) -> &'static str {
        "security-headers"
    }

    async fn handle_request(&self, req: Request, _ctx: &mut RequestContext) -> Result<Flow, GatewayError> {
        Ok(Flow::Continue(req))
    }

    async fn handle_response(&self, mut res: Response, _ctx: &RequestContext) -> Response {
        apply_security_headers(res.headers_mut());
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Body;
    use hyper::header;

    #[test]
    fn test_all_headers_applied() {
        let mut headers = HeaderMap::new();
        apply_security_headers(&mut headers);

        assert_eq!(headers.len(), SECURITY_HEADERS.len());
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["strict-transport-security"], "max-age=31536000; includeSubDomains; preload");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store, no-cache, must-revalidate, max-age=0");
    }

    #[test]
    fn test_existing_header_not_overwritten() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("private, max-age=60"));
        apply_security_headers(&mut headers);
        apply_security_headers(&mut headers);

        assert_eq!(headers[header::CACHE_CONTROL], "private, max-age=60");
        assert_eq!(headers.get_all(header::PRAGMA).iter().count(), 1);
    }

    #[tokio::test]
    async fn test_response_phase_decorates() {
        let mw = SecurityHeadersMiddleware::new();
        let req = hyper::Request::builder().uri("/").body(Body::default()).unwrap();
        let ctx = RequestContext::from_request(&req, None);

        let res = mw.handle_response(Response::new(Body::default()), &ctx).await;
        for (name, value) in SECURITY_HEADERS {
            assert_eq!(res.headers()[name], value);
        }
    }
}

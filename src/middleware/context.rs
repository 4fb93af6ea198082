use crate::auth::Principal;
use super::rate_limit::RateLimitDecision;
use hyper::{header, Method};
use std::net::SocketAddr;
use uuid::Uuid;

/// 상관관계 ID 헤더
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 요청 하나의 파이프라인 실행 동안만 유지되는 컨텍스트
///
/// 인증 협력자가 설정한 주체와 원격 주소처럼 요청 자체에 담기지 않는 정보를
/// 명시적으로 전달합니다. 요청 간에 공유되지 않습니다.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// 로그용 요청 ID (인바운드 X-Request-ID 또는 생성된 UUID)
    pub request_id: String,
    /// 인바운드 X-Request-ID. 에러 응답에 그대로 반영됩니다.
    pub correlation_id: Option<String>,
    pub method: Method,
    pub path: String,
    pub origin: Option<String>,
    pub remote_addr: Option<SocketAddr>,
    pub principal: Option<Principal>,
    /// 속도 제한 미들웨어가 기록한 판정
    pub rate_limit: Option<RateLimitDecision>,
}

impl RequestContext {
    pub fn from_request<B>(req: &hyper::Request<B>, remote_addr: Option<SocketAddr>) -> Self {
        let header_str = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        let correlation_id = header_str(REQUEST_ID_HEADER);
        Self {
            request_id: correlation_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            correlation_id,
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            origin: header_str(header::ORIGIN.as_str()),
            remote_addr,
            principal: None,
            rate_limit: None,
        }
    }
}

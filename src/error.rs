use hyper::StatusCode;
use std::fmt;
use std::time::Duration;

/// 업스트림 호출 실패 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamFailure {
    /// 제한 시간 내에 응답하지 않음 (504)
    Timeout,
    /// 연결 실패 또는 응답 수신 실패 (502)
    Unavailable,
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// 파이프라인 전 구간에서 발생하는 실패
///
/// 각 변형은 HTTP 상태 코드 하나에 대응하며, 클라이언트에게 노출되는 메시지는
/// `ErrorTranslator`가 결정합니다. `Display` 출력은 서버 로그 전용입니다.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 잘못되었거나 지원하지 않는 요청 (4xx, 메시지 그대로 노출)
    #[error("client error {status}: {message}")]
    Client { status: StatusCode, message: String },

    /// 자격증명 누락 또는 불일치 (401/403, 메시지는 일반화)
    #[error("authentication failure {status}: {reason}")]
    Auth {
        status: StatusCode,
        reason: String,
        challenge: Option<String>,
    },

    /// 요청 속도 제한 초과 (429)
    #[error("rate limit exceeded for key {key}, retry after {retry_after:?}")]
    RateLimited { key: String, retry_after: Duration },

    /// 요청을 처리할 백엔드가 없음 (404)
    #[error("no route for path {path}")]
    RouteNotFound { path: String },

    /// 백엔드 타임아웃/연결 실패 (502/504)
    #[error("upstream {kind}: {detail}")]
    Upstream { kind: UpstreamFailure, detail: String },

    /// Rate limit 저장소 응답 없음 (503, fail closed)
    #[error("rate limit store unavailable: {0}")]
    RateLimitStore(String),

    /// 분류되지 않은 내부 오류 (500)
    #[error("internal fault: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn client(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Client {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(reason: impl Into<String>, challenge: Option<String>) -> Self {
        Self::Auth {
            status: StatusCode::UNAUTHORIZED,
            reason: reason.into(),
            challenge,
        }
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Client { status, .. } => *status,
            Self::Auth { status, .. } => *status,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Upstream { kind: UpstreamFailure::Timeout, .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream { kind: UpstreamFailure::Unavailable, .. } => StatusCode::BAD_GATEWAY,
            Self::RateLimitStore(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            GatewayError::client(StatusCode::UNSUPPORTED_MEDIA_TYPE, "x").status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            GatewayError::RouteNotFound { path: "/a".into() }.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::Upstream {
                kind: UpstreamFailure::Timeout,
                detail: "deadline".into()
            }
            .status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            GatewayError::Upstream {
                kind: UpstreamFailure::Unavailable,
                detail: "refused".into()
            }
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GatewayError::internal("boom").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

use super::{Body, RequestContext, Response};
use crate::error::GatewayError;
use bytes::Bytes;
use hyper::header::{self, HeaderValue};
use hyper::StatusCode;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{error, warn};

/// 500 응답의 고정 `error` 값
pub const INTERNAL_ERROR: &str = "Internal Server Error";
/// 500 응답의 고정 `message` 값
pub const INTERNAL_MESSAGE: &str = "An unexpected error occurred";
/// 500 이외의 서버 측 실패에 사용하는 메시지
pub const UNAVAILABLE_MESSAGE: &str = "The service is temporarily unavailable";
/// 에러 봉투 직렬화가 실패했을 때의 본문
pub const FALLBACK_BODY: &str = "An error occurred while processing your request";

/// 실패 시 반환되는 유일한 응답 본문 형식
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub timestamp: String,
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// 모든 실패를 정제된 JSON 응답으로 변환하는 종단 처리기
///
/// 서버 로그에는 원인 전체를 남기고, 클라이언트에는 상태 코드에 맞는
/// 메시지만 내보냅니다. 500 응답은 원인과 관계없이 항상 고정 문자열입니다.
#[derive(Debug, Clone, Default)]
pub struct ErrorTranslator;

impl ErrorTranslator {
    pub fn new() -> Self {
        Self
    }

    /// 실패를 에러 봉투로 변환합니다.
    pub fn envelope(&self, err: &GatewayError, ctx: &RequestContext) -> ErrorEnvelope {
        let status = err.status();
        let (error, message) = if status == StatusCode::INTERNAL_SERVER_ERROR {
            (INTERNAL_ERROR.to_string(), INTERNAL_MESSAGE.to_string())
        } else {
            (reason_phrase(status), public_message(err))
        };

        ErrorEnvelope {
            timestamp: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
            status: status.as_u16(),
            error,
            message,
            path: ctx.path.clone(),
            request_id: ctx.correlation_id.clone(),
        }
    }

    /// 실패를 최종 HTTP 응답으로 변환합니다.
    pub fn translate(&self, err: &GatewayError, ctx: &RequestContext) -> Response {
        let status = err.status();
        if status.is_server_error() {
            error!(request_id = %ctx.request_id, path = %ctx.path, status = status.as_u16(), error = %err, "Gateway error");
        } else {
            warn!(request_id = %ctx.request_id, path = %ctx.path, status = status.as_u16(), error = %err, "Request rejected");
        }

        let envelope = self.envelope(err, ctx);
        let mut res = self.render(status, serde_json::to_vec(&envelope));
        apply_error_headers(&mut res, err);
        res
    }

    /// 직렬화 결과로 응답을 만듭니다. 직렬화 실패 시 평문 대체 본문과 500을 사용합니다.
    pub fn render(&self, status: StatusCode, body: Result<Vec<u8>, serde_json::Error>) -> Response {
        match body {
            Ok(bytes) => {
                let mut res = Response::new(Body::new(Bytes::from(bytes)));
                *res.status_mut() = status;
                res.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                res
            }
            Err(e) => {
                error!(error = %e, "Error writing error response");
                let mut res = Response::new(Body::new(Bytes::from_static(FALLBACK_BODY.as_bytes())));
                *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                res.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                );
                res
            }
        }
    }
}

fn reason_phrase(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("Unknown Status")
        .to_string()
}

/// 클라이언트에게 노출해도 되는 메시지
fn public_message(err: &GatewayError) -> String {
    if err.status().is_server_error() {
        return UNAVAILABLE_MESSAGE.to_string();
    }

    match err {
        GatewayError::Client { message, .. } => message.clone(),
        GatewayError::Auth { status, .. } if *status == StatusCode::FORBIDDEN => {
            "Access is denied".to_string()
        }
        GatewayError::Auth { .. } => {
            "Full authentication is required to access this resource".to_string()
        }
        GatewayError::RateLimited { retry_after, .. } => format!(
            "Too many requests, retry after {} seconds",
            retry_after_secs(*retry_after)
        ),
        GatewayError::RouteNotFound { path } => format!("No route found for path {}", path),
        // 상태 코드가 4xx가 아닌 변형은 위에서 처리됨
        _ => reason_phrase(err.status()),
    }
}

/// Retry-After 헤더 값 (올림, 최소 1초)
pub fn retry_after_secs(retry_after: std::time::Duration) -> u64 {
    (retry_after.as_secs_f64().ceil() as u64).max(1)
}

fn apply_error_headers(res: &mut Response, err: &GatewayError) {
    match err {
        GatewayError::RateLimited { retry_after, .. } => {
            res.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs(*retry_after)),
            );
        }
        GatewayError::Auth {
            challenge: Some(challenge),
            ..
        } => {
            if let Ok(value) = HeaderValue::from_str(challenge) {
                res.headers_mut().insert(header::WWW_AUTHENTICATE, value);
            }
        }
        _ => {}
    }
}

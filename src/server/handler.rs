use crate::error::GatewayError;
use crate::logging::{log_request, RequestLog};
use crate::middleware::{Body, MiddlewareManager, Request, RequestContext, Response};
use crate::proxy::{Backend, HttpBackend};
use crate::settings::Settings;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::StatusCode;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use super::Result;

/// 모든 리스너가 공유하는 요청 처리기
///
/// 본문 수신, 미들웨어 체인 실행, 접근 로그 기록을 담당합니다.
/// 인증은 체인의 identity 단계에서 속도 제한 뒤에 실행됩니다.
pub struct RequestHandler {
    middleware_manager: MiddlewareManager,
    backend: Arc<dyn Backend>,
    max_body_bytes: usize,
}

impl RequestHandler {
    pub fn new(
        middleware_manager: MiddlewareManager,
        backend: Arc<dyn Backend>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            middleware_manager,
            backend,
            max_body_bytes,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let middleware_manager = MiddlewareManager::new(settings)?;
        let backend = HttpBackend::new(&settings.upstream)?;

        Ok(Self::new(
            middleware_manager,
            Arc::new(backend),
            settings.server.max_body_bytes,
        ))
    }

    /// 요청 하나를 처리합니다. 어떤 실패도 응답으로 변환되므로 항상 응답을 반환합니다.
    pub async fn handle<B>(&self, req: hyper::Request<B>, remote_addr: Option<SocketAddr>) -> Response
    where
        B: hyper::body::Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let start_time = Instant::now();
        let mut ctx = RequestContext::from_request(&req, remote_addr);
        let mut log = RequestLog::new(&ctx);

        let response = match self.buffer_request(req).await {
            Ok(req) => {
                self.middleware_manager
                    .execute(req, &mut ctx, self.backend.as_ref())
                    .await
            }
            Err(err) => {
                log.with_error(&err);
                self.middleware_manager.reject(&err, &ctx).await
            }
        };

        log.with_response(response.status());
        log.duration_ms = start_time.elapsed().as_millis() as u64;
        log_request(&log);

        response
    }

    /// 본문을 크기 제한 안에서 모두 수신합니다. 본문은 해석하지 않습니다.
    async fn buffer_request<B>(&self, req: hyper::Request<B>) -> std::result::Result<Request, GatewayError>
    where
        B: hyper::body::Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        let collected = Limited::new(body, self.max_body_bytes)
            .collect()
            .await
            .map_err(|e| {
                if e.downcast_ref::<LengthLimitError>().is_some() {
                    GatewayError::client(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large")
                } else {
                    GatewayError::client(StatusCode::BAD_REQUEST, "Failed to read request body")
                }
            })?;

        Ok(Request::from_parts(parts, Body::new(collected.to_bytes())))
    }

    pub async fn handle_connection<I>(&self, io: I, remote_addr: SocketAddr) -> std::result::Result<(), hyper::Error>
    where
        I: hyper::rt::Read + hyper::rt::Write + Send + Unpin + 'static,
    {
        http1::Builder::new()
            .serve_connection(
                io,
                service_fn(move |req: hyper::Request<Incoming>| async move {
                    Ok::<_, Infallible>(self.handle(req, Some(remote_addr)).await)
                }),
            )
            .await
    }
}

use crate::error::GatewayError;
use crate::middleware::{Body, Flow, Middleware, Request, RequestContext, Response};
use super::policy::CorsPolicy;
use async_trait::async_trait;
use hyper::header::HeaderValue;
use hyper::{header, Method, StatusCode};
use tracing::{debug, instrument};

/// CORS 미들웨어
#[derive(Debug)]
pub struct CorsMiddleware {
    policy: CorsPolicy,
}

impl CorsMiddleware {
    pub fn new(policy: CorsPolicy) -> Self {
        Self { policy }
    }

    /// Preflight 요청 처리
    fn handle_preflight(&self, req: &Request, origin: &str, requested_method: &HeaderValue) -> Result<Response, GatewayError> {
        let requested_method = requested_method
            .to_str()
            .ok()
            .and_then(|m| Method::from_bytes(m.trim().as_bytes()).ok())
            .ok_or_else(invalid_cors_request)?;

        let requested_headers = req
            .headers()
            .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let decision = self.policy.evaluate(Some(origin), &requested_method);
        if !decision.allowed || !self.policy.headers_allowed(requested_headers) {
            debug!(origin, method = %requested_method, headers = requested_headers, "Preflight rejected");
            return Err(invalid_cors_request());
        }

        let mut response = Response::new(Body::default());
        *response.status_mut() = StatusCode::OK;
        decision.apply_preflight(response.headers_mut());
        Ok(response)
    }
}

fn invalid_cors_request() -> GatewayError {
    GatewayError::client(StatusCode::FORBIDDEN, "Invalid CORS request")
}

#[async_trait]
impl Middleware for CorsMiddleware {
    fn name(&self) -> &'static str {
        "cors"
    }

    #[instrument(skip_all, fields(origin = ?ctx.origin))]
    async fn handle_request(&self, req: Request, ctx: &mut RequestContext) -> Result<Flow, GatewayError> {
        // OPTIONS + Origin + Access-Control-Request-Method 조합만 preflight
        if req.method() == Method::OPTIONS {
            let requested_method = req.headers().get(header::ACCESS_CONTROL_REQUEST_METHOD);
            if let (Some(origin), Some(requested_method)) = (ctx.origin.as_deref(), requested_method) {
                debug!("Handling CORS preflight request");
                return Ok(Flow::Respond(self.handle_preflight(&req, origin, requested_method)?));
            }
        }

        Ok(Flow::Continue(req))
    }

    async fn handle_response(&self, mut res: Response, ctx: &RequestContext) -> Response {
        if let Some(origin) = ctx.origin.as_deref() {
            let decision = self.policy.evaluate(Some(origin), &ctx.method);
            decision.apply_actual(res.headers_mut());
        }
        res
    }
}

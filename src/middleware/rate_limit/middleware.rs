use crate::error::GatewayError;
use crate::middleware::{Flow, Middleware, Request, RequestContext, Response};
use super::key::KeyResolver;
use super::limiter::RateLimiter;
use async_trait::async_trait;
use hyper::header::{HeaderName, HeaderValue};
use tracing::debug;

const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const REPLENISH_RATE_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-replenish-rate");
const BURST_CAPACITY_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-burst-capacity");

/// Rate Limit 미들웨어
pub struct RateLimitMiddleware {
    limiter: RateLimiter,
    resolver: Box<dyn KeyResolver>,
}

impl RateLimitMiddleware {
    pub fn new(limiter: RateLimiter, resolver: Box<dyn KeyResolver>) -> Self {
        Self { limiter, resolver }
    }
}

#[async_trait]
impl Middleware for RateLimitMiddleware {
    fn name(&self) -> &'static str {
        "rate-limit"
    }

    async fn handle_request(&self, req: Request, ctx: &mut RequestContext) -> Result<Flow, GatewayError> {
        let key = self.resolver.resolve(&req, ctx);
        debug!("Rate limit check for client: {}", key);

        let decision = self.limiter.allow(&key).await?;
        let retry_after = decision.retry_after;
        let permitted = decision.permitted;
        ctx.rate_limit = Some(decision);

        if permitted {
            Ok(Flow::Continue(req))
        } else {
            Err(GatewayError::RateLimited {
                key,
                retry_after: retry_after.unwrap_or_default(),
            })
        }
    }

    async fn handle_response(&self, mut res: Response, ctx: &RequestContext) -> Response {
        if let Some(decision) = &ctx.rate_limit {
            let config = self.limiter.config();
            let headers = res.headers_mut();
            headers
                .entry(REMAINING_HEADER)
                .or_insert_with(|| HeaderValue::from(decision.remaining_tokens));
            headers
                .entry(REPLENISH_RATE_HEADER)
                .or_insert_with(|| HeaderValue::from(config.replenish_rate));
            headers
                .entry(BURST_CAPACITY_HEADER)
                .or_insert_with(|| HeaderValue::from(config.burst_capacity));
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::rate_limit::{RateLimitConfig, RemoteAddrKeyResolver};
    use crate::middleware::Body;
    use hyper::StatusCode;

    fn middleware(burst: u32) -> RateLimitMiddleware {
        let limiter = RateLimiter::in_memory(RateLimitConfig {
            replenish_rate: 1,
            burst_capacity: burst,
            ..Default::default()
        });
        RateLimitMiddleware::new(limiter, Box::new(RemoteAddrKeyResolver))
    }

    fn request(remote: &str) -> (Request, RequestContext) {
        let req = hyper::Request::builder()
            .uri("/api/v1/accounts")
            .body(Body::default())
            .unwrap();
        let ctx = RequestContext::from_request(&req, Some(remote.parse().unwrap()));
        (req, ctx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_permits_within_burst_and_sets_headers() {
        let mw = middleware(2);
        let (req, mut ctx) = request("10.0.0.1:5000");

        assert!(matches!(mw.handle_request(req, &mut ctx).await.unwrap(), Flow::Continue(_)));
        let res = mw.handle_response(Response::new(Body::default()), &ctx).await;
        assert_eq!(res.headers()["x-ratelimit-remaining"], "1");
        assert_eq!(res.headers()["x-ratelimit-replenish-rate"], "1");
        assert_eq!(res.headers()["x-ratelimit-burst-capacity"], "2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_denies_after_burst() {
        let mw = middleware(1);
        let (req, mut ctx) = request("10.0.0.1:5000");
        mw.handle_request(req, &mut ctx).await.unwrap();

        let (req, mut ctx) = request("10.0.0.1:5001");
        let err = mw.handle_request(req, &mut ctx).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        match err {
            GatewayError::RateLimited { key, retry_after } => {
                assert_eq!(key, "10.0.0.1");
                assert!(retry_after > std::time::Duration::ZERO);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!ctx.rate_limit.unwrap().permitted);

        // 다른 클라이언트는 영향 없음
        let (req, mut ctx) = request("10.0.0.2:5000");
        assert!(mw.handle_request(req, &mut ctx).await.is_ok());
    }
}

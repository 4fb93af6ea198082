//! 호출자 인증과 식별 헤더 전파
//!
//! 인증 협력자로 주체를 결정하고 그 이름을 `X-Auth-Id` 헤더로 백엔드에 전달합니다.
//! 이 헤더는 게이트웨이만 쓸 수 있으므로 인바운드 값은 항상 제거합니다.
//! 자격증명 저장소가 있는 인증기라면 공개 경로 밖에서는 주체가 있어야 합니다.

use crate::auth::{Authenticator, PublicPaths};
use crate::error::GatewayError;
use super::{Flow, Middleware, Request, RequestContext};
use async_trait::async_trait;
use hyper::header::{HeaderName, HeaderValue};
use std::sync::Arc;
use tracing::{debug, warn};

/// 백엔드에 전달되는 신뢰 헤더
pub const AUTH_ID_HEADER: HeaderName = HeaderName::from_static("x-auth-id");

/// 주체가 없을 때 사용하는 식별자
pub const ANONYMOUS_PRINCIPAL: &str = "SYSTEM USER";

pub struct IdentityMiddleware {
    authenticator: Arc<dyn Authenticator>,
    public_paths: PublicPaths,
}

impl IdentityMiddleware {
    pub fn new(authenticator: Arc<dyn Authenticator>, public_paths: PublicPaths) -> Self {
        Self {
            authenticator,
            public_paths,
        }
    }
}

#[async_trait]
impl Middleware for IdentityMiddleware {
    fn name(&self) -> &'static str {
        "identity"
    }

    async fn handle_request(&self, mut req: Request, ctx: &mut RequestContext) -> Result<Flow, GatewayError> {
        if req.headers_mut().remove(&AUTH_ID_HEADER).is_some() {
            warn!(request_id = %ctx.request_id, remote = ?ctx.remote_addr, "Stripped caller-supplied X-Auth-Id header");
        }

        ctx.principal = self.authenticator.authenticate(req.headers()).await?;

        if ctx.principal.is_none() && !self.public_paths.matches(&ctx.path) {
            if let Some(challenge) = self.authenticator.challenge() {
                return Err(GatewayError::unauthorized(
                    format!("credentials required for {}", ctx.path),
                    Some(challenge),
                ));
            }
        }

        let identity = ctx
            .principal
            .as_ref()
            .map(|p| p.name())
            .unwrap_or(ANONYMOUS_PRINCIPAL);
        let value = HeaderValue::from_str(identity).map_err(|e| {
            GatewayError::internal(format!("principal name is not a valid header value: {}", e))
        })?;

        debug!(identity, "Propagating caller identity");
        req.headers_mut().insert(AUTH_ID_HEADER, value);
        Ok(Flow::Continue(req))
    }
}

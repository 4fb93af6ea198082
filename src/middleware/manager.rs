use super::content_type::ContentTypeMiddleware;
use super::cors::{CorsMiddleware, CorsPolicy};
use super::headers::SecurityHeadersMiddleware;
use super::identity::IdentityMiddleware;
use super::rate_limit::{
    ForwardedForKeyResolver, KeyResolver, KeyStrategy, MemoryStore, RateLimitMiddleware,
    RateLimitStore, RateLimiter, RemoteAddrKeyResolver,
};
use super::{MiddlewareChain, Request, RequestContext, Response};
use crate::auth::{create_authenticator, Authenticator, PublicPaths};
use crate::error::GatewayError;
use crate::proxy::Backend;
use crate::settings::{Settings, SettingsError};
use std::sync::Arc;
use tracing::debug;

fn create_key_resolver(strategy: KeyStrategy) -> Box<dyn KeyResolver> {
    match strategy {
        KeyStrategy::RemoteAddr => Box::new(RemoteAddrKeyResolver),
        KeyStrategy::ForwardedFor => Box::new(ForwardedForKeyResolver),
    }
}

/// 설정으로부터 고정 순서의 미들웨어 체인을 구성합니다.
///
/// 순서: cors → rate-limit → content-type → identity → security-headers
pub struct MiddlewareManager {
    chain: MiddlewareChain,
}

impl MiddlewareManager {
    pub fn new(settings: &Settings) -> Result<Self, SettingsError> {
        let authenticator = Arc::from(create_authenticator(&settings.auth)?);
        Self::with_collaborators(settings, authenticator, Arc::new(MemoryStore::new()))
    }

    /// 주어진 인증기와 메모리 저장소로 체인을 구성합니다.
    pub fn with_authenticator(settings: &Settings, authenticator: Arc<dyn Authenticator>) -> Result<Self, SettingsError> {
        Self::with_collaborators(settings, authenticator, Arc::new(MemoryStore::new()))
    }

    /// 외부 인증기와 속도 제한 저장소로 체인을 구성합니다.
    pub fn with_collaborators(
        settings: &Settings,
        authenticator: Arc<dyn Authenticator>,
        store: Arc<dyn RateLimitStore>,
    ) -> Result<Self, SettingsError> {
        settings.rate_limit.validate()?;
        settings.auth.validate()?;
        let policy = CorsPolicy::new(&settings.cors)?;
        let limiter = RateLimiter::new(settings.rate_limit.clone(), store);

        let mut chain = MiddlewareChain::new();
        chain.add(CorsMiddleware::new(policy));
        chain.add(RateLimitMiddleware::new(
            limiter,
            create_key_resolver(settings.rate_limit.key_strategy),
        ));
        chain.add(ContentTypeMiddleware::new());
        chain.add(IdentityMiddleware::new(
            authenticator,
            PublicPaths::new(&settings.auth.public_paths),
        ));
        chain.add(SecurityHeadersMiddleware::new());

        debug!(middlewares = ?chain.names(), "미들웨어 체인 구성 완료");
        Ok(Self { chain })
    }

    pub fn chain(&self) -> &MiddlewareChain {
        &self.chain
    }

    pub async fn execute(&self, req: Request, ctx: &mut RequestContext, backend: &dyn Backend) -> Response {
        self.chain.execute(req, ctx, backend).await
    }

    pub async fn reject(&self, err: &GatewayError, ctx: &RequestContext) -> Response {
        self.chain.reject(err, ctx).await
    }
}

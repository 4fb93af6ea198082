//! Rate Limiting 미들웨어
//!
//! 키별 토큰 버킷으로 요청 속도를 제한합니다. 키는 `KeyResolver`가 요청에서
//! 결정하고, 버킷 상태는 `RateLimitStore`가 소유합니다.

mod config;
mod key;
mod limiter;
mod middleware;
pub mod store;

pub use config::{KeyStrategy, RateLimitConfig};
pub use key::{ForwardedForKeyResolver, KeyResolver, RemoteAddrKeyResolver, FALLBACK_KEY};
pub use limiter::{RateLimitDecision, RateLimiter};
pub use middleware::RateLimitMiddleware;
pub use store::{MemoryStore, RateLimitStore, StoreError};

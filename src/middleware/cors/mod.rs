//! CORS 미들웨어
//!
//! preflight(OPTIONS + Origin + Access-Control-Request-Method) 요청은 즉시
//! 응답하고, 일반 요청에는 응답 헤더만 추가합니다.

mod config;
mod middleware;
mod policy;

pub use config::CorsConfig;
pub use middleware::CorsMiddleware;
pub use policy::{CorsDecision, CorsPolicy, ALLOWED_HEADERS, ALLOWED_METHODS, DEFAULT_MAX_AGE};

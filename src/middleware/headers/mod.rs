//! 보안 헤더 미들웨어
//!
//! 모든 응답(정상, 단락, 에러)에 고정된 보호용 헤더를 추가합니다.

mod middleware;

pub use middleware::{apply_security_headers, SecurityHeadersMiddleware, CONTENT_SECURITY_POLICY, SECURITY_HEADERS};

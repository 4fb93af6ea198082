//! 요청 처리 파이프라인
//!
//! 모든 요청은 고정된 순서의 미들웨어 체인을 통과합니다.
//!
//! 1. CORS preflight 처리
//! 2. 요청 속도 제한
//! 3. Content-Type 검증
//! 4. 호출자 식별 헤더 전파
//! 5. 보안 헤더 주입
//! 6. 백엔드 전달
//!
//! 앞선 미들웨어가 응답을 직접 만들면 이후 단계(백엔드 호출 포함)는 실행되지
//! 않습니다. 응답 단계는 모든 응답(정상, 단락, 에러)에 대해 역순으로 실행됩니다.

pub mod chain;
pub mod content_type;
pub mod context;
pub mod cors;
pub mod headers;
pub mod identity;
pub mod manager;
pub mod rate_limit;
pub mod response;
pub mod traits;

use bytes::Bytes;
use http_body_util::Full;

pub type Body = Full<Bytes>;
pub type Request = hyper::Request<Body>;
pub type Response = hyper::Response<Body>;

pub use chain::MiddlewareChain;
pub use context::RequestContext;
pub use manager::MiddlewareManager;
pub use response::{ErrorEnvelope, ErrorTranslator};
pub use traits::{Flow, Middleware};

//! 인터넷 뱅킹 마이크로서비스 앞단에 위치하는 엣지 게이트웨이입니다.
//!
//! # 주요 기능
//!
//! - 키별 토큰 버킷 요청 속도 제한
//! - CORS preflight 처리와 응답 헤더 적용
//! - 보안 응답 헤더 주입
//! - Content-Type 검증
//! - 호출자 식별 헤더(`X-Auth-Id`) 전파
//! - 모든 실패를 정제된 JSON 에러 봉투로 변환
//!
//! # 예제
//!
//! ```
//! use banking_edge_gateway::middleware::MiddlewareManager;
//! use banking_edge_gateway::settings::Settings;
//!
//! let manager = MiddlewareManager::new(&Settings::default()).unwrap();
//! assert_eq!(
//!     manager.chain().names(),
//!     vec!["cors", "rate-limit", "content-type", "identity", "security-headers"]
//! );
//! ```

pub mod auth;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod proxy;
pub mod server;
pub mod settings;
pub mod tls;

use super::config::RateLimitConfig;
use super::store::{MemoryStore, RateLimitStore};
use crate::error::GatewayError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// 토큰 소비 시도 결과
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitDecision {
    pub permitted: bool,
    /// 판정 이후 남은 토큰 수 (내림)
    pub remaining_tokens: u64,
    /// 거부된 경우 다음 토큰이 생기기까지의 시간
    pub retry_after: Option<Duration>,
}

impl RateLimitDecision {
    pub(crate) fn permitted(tokens: f64) -> Self {
        Self {
            permitted: true,
            remaining_tokens: tokens.max(0.0).floor() as u64,
            retry_after: None,
        }
    }

    pub(crate) fn denied(tokens: f64, retry_after: Duration) -> Self {
        Self {
            permitted: false,
            remaining_tokens: tokens.max(0.0).floor() as u64,
            retry_after: Some(retry_after),
        }
    }
}

/// 키별 토큰 버킷 속도 제한기
///
/// 같은 요청을 두 번 평가하면 토큰도 두 번 소비됩니다.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self { store, config }
    }

    /// 프로세스 내 저장소를 사용하는 제한기
    pub fn in_memory(config: RateLimitConfig) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()))
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// 키에 대해 토큰 하나를 소비하려고 시도합니다.
    ///
    /// 저장소가 실패하거나 제한 시간 내에 응답하지 않으면 요청을 허용하지 않고
    /// `GatewayError::RateLimitStore`를 반환합니다.
    pub async fn allow(&self, key: &str) -> Result<RateLimitDecision, GatewayError> {
        let attempt = self.store.try_acquire(
            key,
            self.config.replenish_rate,
            self.config.burst_capacity,
        );

        match timeout(self.config.store_timeout(), attempt).await {
            Ok(Ok(decision)) => {
                debug!(
                    key,
                    permitted = decision.permitted,
                    remaining = decision.remaining_tokens,
                    "Rate limit evaluated"
                );
                Ok(decision)
            }
            Ok(Err(e)) => {
                warn!(key, error = %e, "Rate limit store failed");
                Err(GatewayError::RateLimitStore(e.to_string()))
            }
            Err(_) => {
                warn!(key, timeout_ms = self.config.store_timeout_ms, "Rate limit store timed out");
                Err(GatewayError::RateLimitStore(format!(
                    "no response within {}ms",
                    self.config.store_timeout_ms
                )))
            }
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

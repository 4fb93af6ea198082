use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use super::limiter::RateLimitDecision;

/// 토큰 버킷 구현
///
/// 불변식: 관찰 시점마다 `0 <= tokens <= capacity`
#[derive(Debug)]
struct TokenBucket {
    /// 현재 사용 가능한 토큰 수
    tokens: f64,
    /// 마지막 보충 시각
    last_refill: Instant,
    /// 초당 보충되는 토큰 수
    rate: f64,
    /// 최대 토큰 수
    capacity: f64,
}

impl TokenBucket {
    /// 새 키는 가득 찬 상태로 시작합니다.
    fn new(rate: f64, capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
            rate,
            capacity,
        }
    }

    /// 경과 시간만큼 토큰을 보충합니다.
    ///
    /// 다른 스레드가 더 늦은 시각으로 먼저 갱신했을 수 있으므로 경과 시간은
    /// 음수가 되지 않게 자르고, 마지막 보충 시각은 뒤로 가지 않습니다.
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.rate).min(self.capacity);
        if now > self.last_refill {
            self.last_refill = now;
        }
    }

    /// 토큰 하나를 소비하려고 시도합니다.
    fn try_consume(&mut self, now: Instant) -> RateLimitDecision {
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            RateLimitDecision::permitted(self.tokens)
        } else {
            let wait = (1.0 - self.tokens) / self.rate;
            RateLimitDecision::denied(self.tokens, Duration::from_secs_f64(wait))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("rate limit store unavailable: {0}")]
    Unavailable(String),
}

/// 속도 제한 저장소 trait
///
/// 같은 키에 대한 보충-차감은 원자적이어야 하고, 서로 다른 키는 서로를
/// 막지 않아야 합니다.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// 키의 버킷에서 토큰 하나를 소비하려고 시도합니다.
    async fn try_acquire(&self, key: &str, rate: u32, capacity: u32) -> Result<RateLimitDecision, StoreError>;
}

/// 프로세스 내 저장소
///
/// 키마다 별도의 뮤텍스를 두어 서로 다른 키는 경합하지 않습니다.
/// 버킷은 처음 관찰될 때 생성되고 삭제되지 않습니다.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    buckets: Arc<DashMap<String, Arc<Mutex<TokenBucket>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 주어진 시각 기준으로 토큰 하나를 소비하려고 시도합니다.
    pub fn acquire_at(&self, key: &str, rate: u32, capacity: u32, now: Instant) -> RateLimitDecision {
        let bucket = match self.buckets.get(key) {
            Some(bucket) => Arc::clone(bucket.value()),
            None => Arc::clone(
                self.buckets
                    .entry(key.to_string())
                    .or_insert_with(|| {
                        debug!(key, rate, capacity, "새로운 토큰 버킷 생성");
                        Arc::new(Mutex::new(TokenBucket::new(rate as f64, capacity as f64, now)))
                    })
                    .value(),
            ),
        };

        let mut bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.try_consume(now)
    }

    /// 추적 중인 키 개수
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn try_acquire(&self, key: &str, rate: u32, capacity: u32) -> Result<RateLimitDecision, StoreError> {
        Ok(self.acquire_at(key, rate, capacity, Instant::now()))
    }
}

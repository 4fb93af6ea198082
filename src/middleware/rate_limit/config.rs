use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::settings::{parse_env_var, SettingsError};

/// 요청 키 결정 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyStrategy {
    /// 연결의 원격 주소
    #[default]
    RemoteAddr,
    /// X-Forwarded-For / X-Real-IP (신뢰할 수 있는 프록시 뒤에서만 사용)
    ForwardedFor,
}

impl std::str::FromStr for KeyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "remote-addr" => Ok(Self::RemoteAddr),
            "forwarded-for" => Ok(Self::ForwardedFor),
            _ => Err(format!("Invalid key strategy: {}", s)),
        }
    }
}

/// Rate Limit 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// 초당 보충되는 토큰 수
    #[serde(default = "default_replenish_rate")]
    pub replenish_rate: u32,

    /// 버스트 허용량 (버킷 용량)
    #[serde(default = "default_burst_capacity")]
    pub burst_capacity: u32,

    /// 키 결정 방식
    #[serde(default)]
    pub key_strategy: KeyStrategy,

    /// 저장소 호출 제한 시간 (밀리초)
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
}

fn default_replenish_rate() -> u32 {
    10 // 기본값: 초당 10 요청
}

fn default_burst_capacity() -> u32 {
    20 // 기본값: 20 요청까지 버스트 허용
}

fn default_store_timeout_ms() -> u64 {
    100
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            replenish_rate: default_replenish_rate(),
            burst_capacity: default_burst_capacity(),
            key_strategy: KeyStrategy::default(),
            store_timeout_ms: default_store_timeout_ms(),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Result<Self, SettingsError> {
        Ok(Self {
            replenish_rate: parse_env_var("GATEWAY_RATE_LIMIT_RPS", default_replenish_rate)?,
            burst_capacity: parse_env_var("GATEWAY_RATE_LIMIT_BURST", default_burst_capacity)?,
            key_strategy: parse_env_var("GATEWAY_RATE_LIMIT_KEY", KeyStrategy::default)?,
            store_timeout_ms: parse_env_var("GATEWAY_RATE_LIMIT_STORE_TIMEOUT_MS", default_store_timeout_ms)?,
        })
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.replenish_rate == 0 {
            return Err(SettingsError::InvalidConfig(
                "Invalid replenish rate for rate limit: 0".to_string(),
            ));
        }
        if self.burst_capacity == 0 {
            return Err(SettingsError::InvalidConfig(
                "Invalid burst capacity for rate limit: 0".to_string(),
            ));
        }
        if self.store_timeout_ms == 0 {
            return Err(SettingsError::InvalidConfig(
                "Invalid store timeout for rate limit: 0".to_string(),
            ));
        }
        Ok(())
    }
}

use serde::Deserialize;
use std::time::Duration;
use url::Url;
use super::{server::parse_env_var, SettingsError};

/// 요청을 전달할 백엔드 설정
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSettings {
    /// 백엔드 기본 URL (http)
    #[serde(default = "default_upstream_url")]
    pub url: String,

    /// 백엔드 호출 제한 시간 (밀리초)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_upstream_url() -> String {
    "http://127.0.0.1:8082".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl UpstreamSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let settings = Self {
            url: parse_env_var("GATEWAY_UPSTREAM_URL", default_upstream_url)?,
            timeout_ms: parse_env_var("GATEWAY_UPSTREAM_TIMEOUT_MS", default_timeout_ms)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |reason: &str| SettingsError::EnvVarInvalid {
            var_name: "GATEWAY_UPSTREAM_URL".to_string(),
            value: self.url.clone(),
            reason: reason.to_string(),
        };

        let url = Url::parse(&self.url).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "http" {
            return Err(invalid("http 스킴만 지원합니다"));
        }
        if url.host_str().is_none() {
            return Err(invalid("호스트가 없습니다"));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("쿼리/프래그먼트는 허용되지 않습니다"));
        }

        if self.timeout_ms == 0 {
            return Err(SettingsError::EnvVarInvalid {
                var_name: "GATEWAY_UPSTREAM_TIMEOUT_MS".to_string(),
                value: "0".to_string(),
                reason: "제한 시간은 0보다 커야 합니다".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

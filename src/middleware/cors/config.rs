use serde::{Deserialize, Serialize};
use url::Url;
use crate::settings::{optional_env_var, parse_env_var, SettingsError};
use super::policy::DEFAULT_MAX_AGE;

/// 와일드카드 origin
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 허용할 Origin 목록 (`*` 단독 사용 가능)
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// credentials 허용 여부
    #[serde(default = "default_allow_credentials")]
    pub allow_credentials: bool,

    /// preflight 요청 캐시 시간 (초)
    #[serde(default = "default_max_age")]
    pub max_age: u32,
}

fn default_allow_credentials() -> bool {
    true
}

fn default_max_age() -> u32 {
    DEFAULT_MAX_AGE
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allow_credentials: default_allow_credentials(),
            max_age: default_max_age(),
        }
    }
}

/// 쉼표로 구분된 origin 목록을 파싱합니다.
pub fn parse_origin_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// origin을 `scheme://host[:port]` 형태로 정규화합니다.
pub fn normalize_origin(origin: &str) -> Result<String, String> {
    let url = Url::parse(origin).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("지원하지 않는 스킴: {}", url.scheme()));
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err("origin에는 경로를 포함할 수 없습니다".to_string());
    }
    Ok(url.origin().ascii_serialization())
}

impl CorsConfig {
    pub fn from_env() -> Result<Self, SettingsError> {
        let config = Self {
            allowed_origins: optional_env_var("GATEWAY_CORS_ALLOWED_ORIGINS")
                .map(|v| parse_origin_list(&v))
                .unwrap_or_default(),
            allow_credentials: parse_env_var("GATEWAY_CORS_ALLOW_CREDENTIALS", default_allow_credentials)?,
            max_age: parse_env_var("GATEWAY_CORS_MAX_AGE", default_max_age)?,
        };
        Ok(config)
    }

    pub fn is_wildcard(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == WILDCARD)
    }

    /// 설정 로드 시점 검증
    ///
    /// 와일드카드 origin과 credentials 조합은 거부합니다.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.is_wildcard() {
            if self.allowed_origins.len() > 1 {
                return Err(SettingsError::InvalidConfig(
                    "와일드카드 origin은 다른 origin과 함께 쓸 수 없습니다".to_string(),
                ));
            }
            if self.allow_credentials {
                return Err(SettingsError::InvalidConfig(
                    "와일드카드 origin(*)은 allow_credentials=true와 함께 쓸 수 없습니다".to_string(),
                ));
            }
            return Ok(());
        }

        for origin in &self.allowed_origins {
            normalize_origin(origin).map_err(|reason| SettingsError::EnvVarInvalid {
                var_name: "GATEWAY_CORS_ALLOWED_ORIGINS".to_string(),
                value: origin.clone(),
                reason,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origin_list() {
        assert_eq!(
            parse_origin_list(" https://a.example.com, https://b.example.com ,,"),
            vec!["https://a.example.com".to_string(), "https://b.example.com".to_string()]
        );
        assert!(parse_origin_list("").is_empty());
    }

    #[test]
    fn test_normalize_origin() {
        assert_eq!(normalize_origin("https://bank.example.com/").unwrap(), "https://bank.example.com");
        assert_eq!(normalize_origin("https://bank.example.com:443").unwrap(), "https://bank.example.com");
        assert_eq!(normalize_origin("http://localhost:3000").unwrap(), "http://localhost:3000");
        assert!(normalize_origin("https://bank.example.com/app").is_err());
        assert!(normalize_origin("ftp://bank.example.com").is_err());
        assert!(normalize_origin("bank.example.com").is_err());
    }

    #[test]
    fn test_wildcard_with_credentials_rejected() {
        let config = CorsConfig {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: true,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SettingsError::InvalidConfig(_))));
    }

    #[test]
    fn test_wildcard_without_credentials_accepted() {
        let config = CorsConfig {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: false,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_origins_validated() {
        let config = CorsConfig {
            allowed_origins: vec!["https://bank.example.com".to_string(), "not-an-origin".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

use std::{env, fs, path::Path};
use serde::Deserialize;
use tracing::debug;
use crate::middleware::cors::CorsConfig;
use crate::middleware::rate_limit::RateLimitConfig;

mod server;
pub mod logging;
mod tls;
mod error;
mod upstream;
mod encryption;
mod auth;

pub use server::ServerSettings;
pub use logging::LogSettings;
pub use tls::TlsSettings;
pub use upstream::UpstreamSettings;
pub use encryption::{EncryptionKey, EncryptionSettings, KeySource};
pub use auth::AuthSettings;
pub use error::SettingsError;

pub type Result<T> = std::result::Result<T, SettingsError>;
pub use server::{optional_env_var, parse_env_var};

/// 실행 프로파일
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Dev,
    Prod,
}

impl std::str::FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Profile::Dev),
            "prod" | "production" => Ok(Profile::Prod),
            _ => Err(format!("Invalid profile: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub profile: Profile,

    // 서버 설정
    #[serde(default)]
    pub server: ServerSettings,

    // 로깅 설정
    #[serde(default)]
    pub logging: LogSettings,

    // TLS 설정
    #[serde(default)]
    pub tls: TlsSettings,

    /// 백엔드 설정
    #[serde(default)]
    pub upstream: UpstreamSettings,

    /// 요청 속도 제한 설정
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// CORS 설정
    #[serde(default)]
    pub cors: CorsConfig,

    /// 인증 협력자 설정
    #[serde(default)]
    pub auth: AuthSettings,

    /// 암호화 키 소스
    #[serde(default)]
    pub encryption: EncryptionSettings,
}

impl Settings {
    pub async fn load() -> Result<Self> {
        if let Ok(config_path) = env::var("GATEWAY_CONFIG_FILE") {
            Self::from_toml_file(&config_path).await
        } else {
            Self::from_env().await
        }
    }

    pub async fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).map_err(|e| SettingsError::FileError {
            path: path.as_ref().to_string_lossy().to_string(),
            error: e,
        })?;

        Self::from_toml_str(&content).await
    }

    pub async fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)
            .map_err(|e| SettingsError::ParseError { source: e })?;

        settings.validate().await?;
        Ok(settings)
    }

    pub async fn from_env() -> Result<Self> {
        let settings = Self {
            profile: parse_env_var("GATEWAY_PROFILE", Profile::default)?,
            server: ServerSettings::from_env()?,
            logging: LogSettings::from_env()?,
            tls: TlsSettings::from_env()?,
            upstream: UpstreamSettings::from_env()?,
            rate_limit: RateLimitConfig::from_env()?,
            cors: CorsConfig::from_env()?,
            auth: AuthSettings::from_env(),
            encryption: EncryptionSettings::from_env(),
        };

        // 설정 생성 시점에 바로 검증
        settings.validate().await?;
        Ok(settings)
    }

    /// 설정 유효성 검증
    pub async fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.tls.validate().await?;
        self.upstream.validate()?;
        self.rate_limit.validate()?;
        self.cors.validate()?;
        self.auth.validate()?;
        self.encryption.validate(self.profile)?;

        debug!(profile = ?self.profile, "설정 검증 완료");
        Ok(())
    }
}

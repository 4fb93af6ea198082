use crate::auth::DEFAULT_PUBLIC_PATHS;
use serde::Deserialize;
use std::path::PathBuf;
use super::{optional_env_var, SettingsError};

/// 인증 협력자 설정
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// bcrypt htpasswd 파일. 없으면 모든 요청이 익명으로 처리됩니다.
    #[serde(default)]
    pub htpasswd_path: Option<PathBuf>,

    /// WWW-Authenticate 응답의 realm
    #[serde(default = "default_realm")]
    pub realm: String,

    /// 자격증명 없이 통과하는 경로 (`/prefix/**` 또는 정확한 경로)
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

fn default_realm() -> String {
    "Internet Banking".to_string()
}

fn default_public_paths() -> Vec<String> {
    DEFAULT_PUBLIC_PATHS.iter().map(|p| p.to_string()).collect()
}

impl AuthSettings {
    pub fn from_env() -> Self {
        Self {
            htpasswd_path: optional_env_var("GATEWAY_AUTH_HTPASSWD").map(PathBuf::from),
            realm: optional_env_var("GATEWAY_AUTH_REALM").unwrap_or_else(default_realm),
            public_paths: optional_env_var("GATEWAY_AUTH_PUBLIC_PATHS")
                .map(|v| {
                    v.split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or_else(default_public_paths),
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.realm.contains('"') {
            return Err(SettingsError::InvalidConfig(
                "realm에는 큰따옴표를 쓸 수 없습니다".to_string(),
            ));
        }
        if let Some(pattern) = self.public_paths.iter().find(|p| !p.starts_with('/')) {
            return Err(SettingsError::InvalidConfig(format!(
                "공개 경로는 '/'로 시작해야 합니다: {}",
                pattern
            )));
        }
        Ok(())
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            htpasswd_path: None,
            realm: default_realm(),
            public_paths: default_public_paths(),
        }
    }
}

//! 인증 협력자
//!
//! identity 단계에서 요청의 검증된 주체(principal)를 결정합니다.
//! 속도 제한 뒤에서 실행되므로 실패한 로그인도 토큰을 소비합니다.
//! JWT 검증은 이 크레이트의 범위 밖이며, 데모용으로 htpasswd 기반
//! Basic 인증기를 제공합니다.

mod htpasswd;
mod paths;

pub use htpasswd::HtpasswdAuthenticator;
pub use paths::{PublicPaths, DEFAULT_PUBLIC_PATHS};

use crate::error::GatewayError;
use crate::settings::{AuthSettings, SettingsError};
use async_trait::async_trait;
use hyper::HeaderMap;

/// 인증된 호출자
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    name: String,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// 요청 헤더로부터 주체를 결정하는 인증기 트레이트
///
/// - 자격증명이 없으면 `Ok(None)`
/// - 자격증명이 있지만 유효하지 않으면 `Err(GatewayError::Auth)`
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// 보호 경로에서 자격증명이 없을 때 돌려줄 `WWW-Authenticate` 값
    ///
    /// `None`이면 자격증명 저장소가 없는 것으로 보고 모든 경로를 익명으로 허용합니다.
    fn challenge(&self) -> Option<String> {
        None
    }

    async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<Principal>, GatewayError>;
}

/// 항상 익명으로 처리하는 인증기
#[derive(Debug, Default, Clone)]
pub struct AnonymousAuthenticator;

#[async_trait]
impl Authenticator for AnonymousAuthenticator {
    async fn authenticate(&self, _headers: &HeaderMap) -> Result<Option<Principal>, GatewayError> {
        Ok(None)
    }
}

/// 인증기 팩토리
pub fn create_authenticator(settings: &AuthSettings) -> Result<Box<dyn Authenticator>, SettingsError> {
    match &settings.htpasswd_path {
        Some(path) => {
            let mut authenticator = HtpasswdAuthenticator::new(path.clone(), settings.realm.clone());
            authenticator.load_credentials()?;
            Ok(Box::new(authenticator))
        }
        None => Ok(Box::new(AnonymousAuthenticator)),
    }
}

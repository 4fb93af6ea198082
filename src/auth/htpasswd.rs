use super::{Authenticator, Principal};
use crate::error::GatewayError;
use crate::settings::SettingsError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hyper::{header, HeaderMap};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// .htpasswd 파일 기반 Basic 인증기
///
/// # 예시
/// ```text
/// # .htpasswd 파일 형식 (bcrypt 해시만 지원)
/// alice:$2y$05$c4WoMPo3SXsafkva.HHa6uXQZWr7oboPiC2bT/r7q1BB8I2s0BRqC
/// ```
pub struct HtpasswdAuthenticator {
    path: PathBuf,
    realm: String,
    users: Arc<HashMap<String, String>>,
}

impl HtpasswdAuthenticator {
    pub fn new(path: PathBuf, realm: String) -> Self {
        Self {
            path,
            realm,
            users: Arc::new(HashMap::new()),
        }
    }

    /// 파일에서 사용자 목록을 다시 읽습니다.
    pub fn load_credentials(&mut self) -> Result<(), SettingsError> {
        let content = fs::read_to_string(&self.path).map_err(|e| SettingsError::FileError {
            path: self.path.to_string_lossy().to_string(),
            error: e,
        })?;

        let mut users = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((username, hash)) = line.split_once(':') {
                users.insert(username.to_string(), hash.to_string());
            }
        }

        debug!(path = %self.path.display(), users = users.len(), "htpasswd 사용자 로드 완료");
        self.users = Arc::new(users);
        Ok(())
    }

    fn reject(&self, reason: &str) -> GatewayError {
        GatewayError::unauthorized(reason, self.challenge())
    }
}

/// Authorization 헤더에서 Basic 자격증명을 추출합니다.
///
/// 헤더가 없으면 `None`, 형식이 잘못되었으면 `Some(Err(()))`.
fn extract_credentials(headers: &HeaderMap) -> Option<Result<(String, String), ()>> {
    let value = headers.get(header::AUTHORIZATION)?;
    let parsed = value
        .to_str()
        .ok()
        .and_then(|auth| auth.strip_prefix("Basic "))
        .and_then(|encoded| BASE64.decode(encoded.trim()).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok())
        .and_then(|pair| {
            pair.split_once(':')
                .map(|(user, pass)| (user.to_string(), pass.to_string()))
        });
    Some(parsed.ok_or(()))
}

/// 비밀번호 검증 함수
fn verify_password(password: &str, hash: &str) -> bool {
    if hash.starts_with("$2") {
        bcrypt::verify(password, hash).unwrap_or(false)
    } else {
        // bcrypt가 아닌 해시는 지원하지 않음
        false
    }
}

#[async_trait]
impl Authenticator for HtpasswdAuthenticator {
    fn challenge(&self) -> Option<String> {
        Some(format!("Basic realm=\"{}\"", self.realm))
    }

    async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<Principal>, GatewayError> {
        let (username, password) = match extract_credentials(headers) {
            None => return Ok(None),
            Some(Err(())) => return Err(self.reject("malformed Basic Authorization header")),
            Some(Ok(credentials)) => credentials,
        };

        let hash = match self.users.get(&username) {
            Some(hash) => hash.clone(),
            None => {
                warn!(user = %username, "알 수 없는 사용자");
                return Err(self.reject("unknown user"));
            }
        };

        // bcrypt 검증은 blocking 풀에서
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(GatewayError::internal)?;

        if verified {
            Ok(Some(Principal::new(username)))
        } else {
            warn!(user = %username, "비밀번호 불일치");
            Err(self.reject("invalid password"))
        }
    }
}

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};
use super::{optional_env_var, Profile, SettingsError};

/// 대칭키 소스 설정
///
/// 파일이 인라인 값보다 우선합니다. 인라인 값은 base64로 인코딩되어야 합니다.
#[derive(Clone, Default, Deserialize)]
pub struct EncryptionSettings {
    /// base64 인코딩된 키
    #[serde(default)]
    pub key: Option<String>,

    /// 원시 키 바이트가 들어 있는 파일
    #[serde(default)]
    pub key_file: Option<PathBuf>,
}

/// 키를 어디서 얻었는지
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    File(PathBuf),
    Inline,
    Ephemeral,
}

/// 암호화 협력자에게 전달되는 대칭키
#[derive(Clone)]
pub struct EncryptionKey {
    bytes: Vec<u8>,
    source: KeySource,
}

impl EncryptionKey {
    const VALID_LENGTHS: [usize; 3] = [16, 24, 32];

    fn new(bytes: Vec<u8>, source: KeySource) -> Result<Self, SettingsError> {
        if !Self::VALID_LENGTHS.contains(&bytes.len()) {
            return Err(SettingsError::InvalidConfig(format!(
                "암호화 키 길이는 16, 24, 32 바이트 중 하나여야 합니다 (현재 {} 바이트)",
                bytes.len()
            )));
        }
        Ok(Self { bytes, source })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn source(&self) -> &KeySource {
        &self.source
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("len", &self.bytes.len())
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Debug for EncryptionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionSettings")
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("key_file", &self.key_file)
            .finish()
    }
}

impl EncryptionSettings {
    pub fn from_env() -> Self {
        Self {
            key: optional_env_var("GATEWAY_ENCRYPT_KEY"),
            key_file: optional_env_var("GATEWAY_ENCRYPT_KEY_FILE").map(PathBuf::from),
        }
    }

    /// 키 소스가 하나라도 설정되었는지
    pub fn is_configured(&self) -> bool {
        self.key.is_some() || self.key_file.is_some()
    }

    /// 파일을 읽지 않고 확인 가능한 규칙만 검사합니다.
    pub fn validate(&self, profile: Profile) -> Result<(), SettingsError> {
        if profile == Profile::Prod && !self.is_configured() {
            return Err(SettingsError::EnvVarMissing {
                var_name: "GATEWAY_ENCRYPT_KEY or GATEWAY_ENCRYPT_KEY_FILE".to_string(),
            });
        }
        if self.key_file.is_none() {
            if let Some(inline) = &self.key {
                EncryptionKey::new(decode_inline(inline)?, KeySource::Inline)?;
            }
        }
        Ok(())
    }

    /// 키를 로드합니다.
    ///
    /// prod 프로파일에서 키가 없으면 실패하고, dev에서는 임시 키를 생성합니다.
    pub fn resolve(&self, profile: Profile) -> Result<EncryptionKey, SettingsError> {
        if let Some(path) = &self.key_file {
            let bytes = std::fs::read(path).map_err(|e| SettingsError::FileError {
                path: path.to_string_lossy().to_string(),
                error: e,
            })?;
            info!(path = %path.display(), "Using encryption key from file");
            return EncryptionKey::new(bytes, KeySource::File(path.clone()));
        }

        if let Some(inline) = &self.key {
            let bytes = decode_inline(inline)?;
            info!("Using encryption key from configuration");
            return EncryptionKey::new(bytes, KeySource::Inline);
        }

        if profile == Profile::Prod {
            return Err(SettingsError::EnvVarMissing {
                var_name: "GATEWAY_ENCRYPT_KEY or GATEWAY_ENCRYPT_KEY_FILE".to_string(),
            });
        }

        warn!("No encryption key provided, generating an ephemeral key (never do this in production)");
        let mut bytes = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        EncryptionKey::new(bytes, KeySource::Ephemeral)
    }
}

fn decode_inline(value: &str) -> Result<Vec<u8>, SettingsError> {
    BASE64
        .decode(value.trim())
        .map_err(|e| SettingsError::EnvVarInvalid {
            var_name: "GATEWAY_ENCRYPT_KEY".to_string(),
            value: "<redacted>".to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_prod_refuses_without_key() {
        let settings = EncryptionSettings::default();
        assert!(settings.validate(Profile::Prod).is_err());
        assert!(settings.resolve(Profile::Prod).is_err());
    }

    #[test]
    fn test_dev_generates_ephemeral_key() {
        let key = EncryptionSettings::default().resolve(Profile::Dev).unwrap();
        assert_eq!(key.source(), &KeySource::Ephemeral);
        assert_eq!(key.as_bytes().len(), 32);
    }

    #[test]
    fn test_inline_key() {
        let settings = EncryptionSettings {
            key: Some(BASE64.encode([7u8; 16])),
            key_file: None,
        };
        assert!(settings.validate(Profile::Prod).is_ok());
        let key = settings.resolve(Profile::Prod).unwrap();
        assert_eq!(key.source(), &KeySource::Inline);
        assert_eq!(key.as_bytes(), &[7u8; 16]);
    }

    #[test]
    fn test_inline_key_must_be_base64_with_valid_length() {
        let not_base64 = EncryptionSettings {
            key: Some("%%%".to_string()),
            key_file: None,
        };
        assert!(not_base64.validate(Profile::Dev).is_err());

        let short = EncryptionSettings {
            key: Some(BASE64.encode([1u8; 5])),
            key_file: None,
        };
        assert!(short.validate(Profile::Dev).is_err());
        assert!(short.resolve(Profile::Dev).is_err());
    }

    #[test]
    fn test_file_takes_priority() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[9u8; 32]).unwrap();

        let settings = EncryptionSettings {
            key: Some(BASE64.encode([7u8; 16])),
            key_file: Some(file.path().to_path_buf()),
        };
        let key = settings.resolve(Profile::Prod).unwrap();
        assert_eq!(key.source(), &KeySource::File(file.path().to_path_buf()));
        assert_eq!(key.as_bytes(), &[9u8; 32]);
    }

    #[test]
    fn test_debug_hides_key_material() {
        let settings = EncryptionSettings {
            key: Some(BASE64.encode([0xABu8; 16])),
            key_file: None,
        };
        let key = settings.resolve(Profile::Dev).unwrap();
        let rendered = format!("{:?}", key);
        assert!(rendered.contains("len: 16"));
        assert!(!rendered.contains("171"));
    }
}

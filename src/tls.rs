use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_rustls::rustls::{self, Certificate, PrivateKey};
use tokio_rustls::TlsAcceptor;
use tracing::{error, info};
use crate::server::ServerError;
use crate::settings::TlsSettings;

pub struct TlsConfig {
    pub acceptor: TlsAcceptor,
    pub listener: TcpListener,
}

impl TlsConfig {
    pub async fn new(settings: &TlsSettings) -> Result<Self, ServerError> {
        let (cert_path, key_path) = match (&settings.cert_path, &settings.key_path) {
            (Some(cert), Some(key)) => (cert, key),
            _ => return Err(ServerError::Tls("인증서와 개인키 경로가 모두 필요합니다".to_string())),
        };

        let tls_config = load_tls_config(cert_path, key_path)?;
        let acceptor = TlsAcceptor::from(Arc::new(tls_config));

        let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            error!(error = %e, port = settings.port, "HTTPS 포트 바인딩 실패");
            ServerError::Bind { addr, source: e }
        })?;

        info!(port = settings.port, "HTTPS 리스너 시작");
        Ok(Self { acceptor, listener })
    }
}

/// PEM 인증서 체인과 개인키(PKCS#8, 없으면 RSA)로 서버 설정을 만듭니다.
pub fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<rustls::ServerConfig, ServerError> {
    let mut cert_reader = BufReader::new(File::open(cert_path)?);
    let certs: Vec<Certificate> = rustls_pemfile::certs(&mut cert_reader)?
        .into_iter()
        .map(Certificate)
        .collect();
    if certs.is_empty() {
        return Err(ServerError::Tls(format!(
            "인증서를 찾을 수 없음: {}",
            cert_path.display()
        )));
    }

    let mut key_reader = BufReader::new(File::open(key_path)?);
    let mut keys = rustls_pemfile::pkcs8_private_keys(&mut key_reader)?;
    if keys.is_empty() {
        let mut key_reader = BufReader::new(File::open(key_path)?);
        keys = rustls_pemfile::rsa_private_keys(&mut key_reader)?;
    }
    let key = keys
        .into_iter()
        .next()
        .ok_or_else(|| ServerError::Tls(format!("개인키를 찾을 수 없음: {}", key_path.display())))?;

    rustls::ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(certs, PrivateKey(key))
        .map_err(|e| ServerError::Tls(e.to_string()))
}

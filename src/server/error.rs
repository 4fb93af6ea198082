use crate::settings::SettingsError;
use std::net::SocketAddr;

/// 리스너/TLS 구성 및 기동 실패
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Config Error: {0}")]
    Config(#[from] SettingsError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS Error: {0}")]
    Tls(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

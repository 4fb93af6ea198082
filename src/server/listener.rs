use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use hyper_util::rt::TokioIo;
use crate::settings::Settings;
use crate::tls::TlsConfig;
use tracing::{error, info};
use super::error::ServerError;
use super::handler::RequestHandler;
use super::Result;

pub struct ServerListener {
    http_listener: TcpListener,
    https_config: Option<TlsConfig>,
}

impl ServerListener {
    pub async fn new(settings: &Settings) -> Result<Self> {
        let addr = SocketAddr::from(([0, 0, 0, 0], settings.server.http_port));
        let https_config = if settings.tls.enabled {
            Some(TlsConfig::new(&settings.tls).await?)
        } else {
            None
        };

        Self::bind(addr, https_config).await
    }

    /// 주어진 주소에 HTTP 리스너를 엽니다.
    pub async fn bind(addr: SocketAddr, https_config: Option<TlsConfig>) -> Result<Self> {
        let http_listener = TcpListener::bind(addr).await.map_err(|e| {
            error!(error = %e, addr = %addr, "HTTP 포트 바인딩 실패");
            ServerError::Bind { addr, source: e }
        })?;

        info!(addr = %http_listener.local_addr()?, "HTTP 리스너 시작");
        Ok(Self {
            http_listener,
            https_config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.http_listener.local_addr()?)
    }

    pub async fn run(self, handler: Arc<RequestHandler>) -> Result<()> {
        loop {
            tokio::select! {
                result = self.http_listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let handler = handler.clone();
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                if let Err(err) = handler.handle_connection(io, remote_addr).await {
                                    error!(error = %err, remote_addr = %remote_addr, "HTTP 연결 처리 실패");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "HTTP 연결 수락 실패");
                        }
                    }
                }

                result = async {
                    if let Some(config) = &self.https_config {
                        config.listener.accept().await
                    } else {
                        std::future::pending().await
                    }
                } => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let Some(config) = self.https_config.as_ref() else {
                                continue;
                            };
                            let handler = handler.clone();
                            let acceptor = config.acceptor.clone();

                            tokio::spawn(async move {
                                match acceptor.accept(stream).await {
                                    Ok(tls_stream) => {
                                        let io = TokioIo::new(tls_stream);
                                        if let Err(err) = handler.handle_connection(io, remote_addr).await {
                                            error!(error = %err, remote_addr = %remote_addr, "HTTPS 연결 처리 실패");
                                        }
                                    }
                                    Err(e) => {
                                        error!(error = %e, remote_addr = %remote_addr, "TLS 핸드쉐이크 실패");
                                    }
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "HTTPS 연결 수락 실패");
                        }
                    }
                }
            }
        }
    }
}

use crate::error::{GatewayError, UpstreamFailure};
use crate::middleware::{Body, Request, RequestContext, Response};
use crate::settings::{SettingsError, UpstreamSettings};
use async_trait::async_trait;
use http_body_util::BodyExt;
use hyper::header::{self, HeaderMap, HeaderName, HeaderValue};
use hyper::Uri;
use hyper_util::client::legacy;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument};
use url::Url;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// 연결 단위로만 의미가 있어 전달하지 않는 헤더
const HOP_BY_HOP_HEADERS: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// 체인을 통과한 요청을 받아 응답을 돌려주는 백엔드 협력자
///
/// 라우팅과 로드 밸런싱은 이 trait 뒤에 숨겨집니다.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn forward(&self, req: Request, ctx: &RequestContext) -> Result<Response, GatewayError>;
}

/// 단일 업스트림으로 요청을 전달하는 HTTP 백엔드
#[derive(Clone)]
pub struct HttpBackend {
    client: legacy::Client<HttpConnector, Body>,
    /// `http://host:port`
    origin: String,
    /// 업스트림 기본 경로 (끝의 `/` 제거)
    base_path: String,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(settings: &UpstreamSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        let url = Url::parse(&settings.url).map_err(|e| SettingsError::EnvVarInvalid {
            var_name: "GATEWAY_UPSTREAM_URL".to_string(),
            value: settings.url.clone(),
            reason: e.to_string(),
        })?;

        let host = url.host_str().unwrap_or_default();
        let origin = match url.port_or_known_default() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        };

        let connector = HttpConnector::new();
        let client = legacy::Client::builder(TokioExecutor::new()).build::<_, Body>(connector);

        Ok(Self {
            client,
            origin,
            base_path: url.path().trim_end_matches('/').to_string(),
            timeout: settings.timeout(),
        })
    }

    /// 요청 URI를 업스트림 주소로 옮깁니다.
    fn target_uri(&self, uri: &Uri) -> Result<Uri, GatewayError> {
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        if !path_and_query.starts_with('/') {
            return Err(GatewayError::RouteNotFound {
                path: uri.path().to_string(),
            });
        }

        format!("{}{}{}", self.origin, self.base_path, path_and_query)
            .parse()
            .map_err(GatewayError::internal)
    }

    fn build_proxied_request(&self, req: Request, ctx: &RequestContext) -> Result<Request, GatewayError> {
        let uri = self.target_uri(req.uri())?;
        let (mut parts, body) = req.into_parts();

        strip_hop_by_hop(&mut parts.headers);
        parts.headers.remove(header::HOST);
        if let Some(addr) = ctx.remote_addr {
            append_forwarded_for(&mut parts.headers, &addr.ip().to_string())?;
        }

        parts.uri = uri;
        Ok(Request::from_parts(parts, body))
    }

    async fn send(&self, req: Request) -> Result<Response, GatewayError> {
        let res = self.client.request(req).await.map_err(|e| GatewayError::Upstream {
            kind: UpstreamFailure::Unavailable,
            detail: format!("Backend request failed: {}", e),
        })?;

        let (mut parts, body) = res.into_parts();
        let bytes = body
            .collect()
            .await
            .map_err(|e| GatewayError::Upstream {
                kind: UpstreamFailure::Unavailable,
                detail: format!("Failed to collect response body: {}", e),
            })?
            .to_bytes();
        debug!(bytes_size = bytes.len(), "Response body collected");

        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(bytes)))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    #[instrument(skip_all, fields(request_id = %ctx.request_id))]
    async fn forward(&self, req: Request, ctx: &RequestContext) -> Result<Response, GatewayError> {
        let proxied = self.build_proxied_request(req, ctx)?;
        let uri = proxied.uri().clone();
        info!(backend = %uri, "Proxying request to backend");

        match timeout(self.timeout, self.send(proxied)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Upstream {
                kind: UpstreamFailure::Timeout,
                detail: format!(
                    "{} did not respond within {}ms",
                    uri,
                    self.timeout.as_millis()
                ),
            }),
        }
    }
}

/// hop-by-hop 헤더와 Connection 헤더에 나열된 헤더를 제거합니다.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP_HEADERS.iter()) {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: &str) -> Result<(), GatewayError> {
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.trim().is_empty() => format!("{}, {}", existing, ip),
        _ => ip.to_string(),
    };
    let value = HeaderValue::from_str(&value).map_err(GatewayError::internal)?;
    headers.insert(X_FORWARDED_FOR, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::StatusCode;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    fn backend(url: &str, timeout_ms: u64) -> HttpBackend {
        HttpBackend::new(&UpstreamSettings {
            url: url.to_string(),
            timeout_ms,
        })
        .unwrap()
    }

    fn request(uri: &str) -> (Request, RequestContext) {
        let req = hyper::Request::builder()
            .uri(uri)
            .header(header::HOST, "gateway.example.com")
            .header(header::CONNECTION, "keep-alive, x-internal-hop")
            .header("x-internal-hop", "1")
            .header("keep-alive", "timeout=5")
            .header("x-forwarded-for", "203.0.113.7")
            .header(header::ACCEPT, "application/json")
            .body(Body::default())
            .unwrap();
        let remote: SocketAddr = "10.0.0.5:40000".parse().unwrap();
        let ctx = RequestContext::from_request(&req, Some(remote));
        (req, ctx)
    }

    #[test]
    fn test_target_uri_keeps_path_and_query() {
        let backend = backend("http://127.0.0.1:8082/bank/", 1000);
        let uri: Uri = "/api/v1/accounts?page=2".parse().unwrap();
        assert_eq!(
            backend.target_uri(&uri).unwrap().to_string(),
            "http://127.0.0.1:8082/bank/api/v1/accounts?page=2"
        );
    }

    #[test]
    fn test_target_uri_default_port() {
        let backend = backend("http://accounts.internal", 1000);
        let uri: Uri = "/health".parse().unwrap();
        assert_eq!(
            backend.target_uri(&uri).unwrap().to_string(),
            "http://accounts.internal:80/health"
        );
    }

    #[test]
    fn test_asterisk_form_has_no_route() {
        let backend = backend("http://127.0.0.1:8082", 1000);
        let uri: Uri = "*".parse().unwrap();
        let err = backend.target_uri(&uri).unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_proxied_request_headers() {
        let backend = backend("http://127.0.0.1:8082", 1000);
        let (req, ctx) = request("/api/v1/transfers");
        let proxied = backend.build_proxied_request(req, &ctx).unwrap();

        let headers = proxied.headers();
        assert!(!headers.contains_key(header::HOST));
        assert!(!headers.contains_key(header::CONNECTION));
        assert!(!headers.contains_key("keep-alive"));
        assert!(!headers.contains_key("x-internal-hop"));
        assert_eq!(headers["x-forwarded-for"], "203.0.113.7, 10.0.0.5");
        assert_eq!(headers[header::ACCEPT], "application/json");
        assert_eq!(proxied.uri().to_string(), "http://127.0.0.1:8082/api/v1/transfers");
    }

    #[tokio::test]
    async fn test_connection_refused_is_bad_gateway() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = backend(&format!("http://{}", addr), 1000);
        let (req, ctx) = request("/api/v1/accounts");
        let err = backend.forward(req, &ctx).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_silent_backend_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // 연결은 받지만 응답하지 않음
        let _hold = tokio::spawn(async move {
            let mut sockets = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                sockets.push(socket);
            }
        });

        let backend = backend(&format!("http://{}", addr), 100);
        let (req, ctx) = request("/api/v1/accounts");
        let err = backend.forward(req, &ctx).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}

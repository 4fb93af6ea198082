use banking_edge_gateway::server::{RequestHandler, ServerListener};
use banking_edge_gateway::settings::{Settings, UpstreamSettings};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// 받은 헤더 일부를 JSON으로 돌려주는 백엔드
async fn spawn_stub_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let service = service_fn(|req: hyper::Request<Incoming>| async move {
                    let header = |name: &str| {
                        req.headers()
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string()
                    };
                    let body = serde_json::json!({
                        "path": req.uri().path(),
                        "authId": header("x-auth-id"),
                        "forwardedFor": header("x-forwarded-for"),
                    });
                    let res = hyper::Response::builder()
                        .header("content-type", "application/json")
                        .body(Full::new(Bytes::from(body.to_string())))
                        .unwrap();
                    Ok::<_, Infallible>(res)
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    addr
}

async fn spawn_gateway(upstream: SocketAddr) -> SocketAddr {
    let settings = Settings {
        upstream: UpstreamSettings {
            url: format!("http://{}", upstream),
            timeout_ms: 2_000,
        },
        ..Default::default()
    };

    let handler = Arc::new(RequestHandler::from_settings(&settings).unwrap());
    let listener = ServerListener::bind("127.0.0.1:0".parse().unwrap(), None)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(listener.run(handler));
    addr
}

#[tokio::test]
async fn test_request_is_forwarded_with_identity_and_headers() {
    let backend = spawn_stub_backend().await;
    let gateway = spawn_gateway(backend).await;

    let res = reqwest::Client::new()
        .get(format!("http://{}/api/v1/accounts", gateway))
        .header("X-Auth-Id", "forged-admin")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-content-type-options"], "nosniff");
    assert_eq!(res.headers()["x-frame-options"], "DENY");
    assert_eq!(res.headers()["x-ratelimit-burst-capacity"], "20");

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["path"], "/api/v1/accounts");
    assert_eq!(body["authId"], "SYSTEM USER");
    assert_eq!(body["forwardedFor"], "127.0.0.1");
}

#[tokio::test]
async fn test_unsupported_media_type_over_the_wire() {
    let backend = spawn_stub_backend().await;
    let gateway = spawn_gateway(backend).await;

    let res = reqwest::Client::new()
        .put(format!("http://{}/api/v1/accounts/1", gateway))
        .header("Content-Type", "text/plain")
        .header("X-Request-ID", "wire-1")
        .body("plain")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 415);
    assert_eq!(res.headers()["content-type"], "application/json");

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], 415);
    assert_eq!(body["requestId"], "wire-1");
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream = closed.local_addr().unwrap();
    drop(closed);

    let gateway = spawn_gateway(upstream).await;

    let res = reqwest::get(format!("http://{}/api/v1/accounts", gateway))
        .await
        .unwrap();

    assert_eq!(res.status(), 502);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Bad Gateway");
    assert_eq!(body["message"], "The service is temporarily unavailable");
    assert!(!body.to_string().contains(&upstream.to_string()));
}

use async_trait::async_trait;
use banking_edge_gateway::error::GatewayError;
use banking_edge_gateway::middleware::{Body, Request, RequestContext, Response};
use banking_edge_gateway::proxy::Backend;
use bytes::Bytes;
use hyper::HeaderMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// 호출 기록을 남기는 테스트용 백엔드
pub struct MockBackend {
    calls: AtomicUsize,
    seen_headers: Mutex<Vec<HeaderMap>>,
    reply: fn() -> Result<Response, GatewayError>,
}

impl MockBackend {
    pub fn new(reply: fn() -> Result<Response, GatewayError>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            seen_headers: Mutex::new(Vec::new()),
            reply,
        }
    }

    pub fn ok() -> Self {
        Self::new(|| {
            let mut res = Response::new(Body::new(Bytes::from_static(br#"{"balance":100}"#)));
            res.headers_mut()
                .insert("content-type", "application/json".parse().unwrap());
            Ok(res)
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_headers(&self) -> HeaderMap {
        self.seen_headers.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn forward(&self, req: Request, _ctx: &RequestContext) -> Result<Response, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_headers.lock().unwrap().push(req.headers().clone());
        (self.reply)()
    }
}

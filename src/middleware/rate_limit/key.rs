use crate::middleware::{Request, RequestContext};

/// 키를 결정할 수 없을 때 사용하는 공용 키
///
/// 이 키를 공유하는 요청들은 같은 버킷을 소비합니다.
pub const FALLBACK_KEY: &str = "unknown";

/// 요청에서 속도 제한 키를 결정합니다. 부수 효과가 없어야 합니다.
pub trait KeyResolver: Send + Sync {
    fn resolve(&self, req: &Request, ctx: &RequestContext) -> String;
}

/// 연결의 원격 IP를 키로 사용
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteAddrKeyResolver;

impl KeyResolver for RemoteAddrKeyResolver {
    fn resolve(&self, _req: &Request, ctx: &RequestContext) -> String {
        ctx.remote_addr
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| FALLBACK_KEY.to_string())
    }
}

/// X-Forwarded-For의 첫 번째 주소, X-Real-IP, 원격 IP 순으로 키를 결정
///
/// 클라이언트가 헤더를 위조할 수 있으므로 신뢰할 수 있는 프록시 뒤에서만 사용합니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardedForKeyResolver;

impl KeyResolver for ForwardedForKeyResolver {
    fn resolve(&self, req: &Request, ctx: &RequestContext) -> String {
        let headers = req.headers();

        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = real_ip {
            return ip.to_string();
        }

        RemoteAddrKeyResolver.resolve(req, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Body;
    use std::net::SocketAddr;

    fn request(headers: &[(&str, &str)], remote: Option<&str>) -> (Request, RequestContext) {
        let mut builder = hyper::Request::builder().uri("/api/v1/accounts");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let req = builder.body(Body::default()).unwrap();
        let remote = remote.map(|r| r.parse::<SocketAddr>().unwrap());
        let ctx = RequestContext::from_request(&req, remote);
        (req, ctx)
    }

    #[test]
    fn test_remote_addr_key() {
        let (req, ctx) = request(&[("X-Forwarded-For", "1.2.3.4")], Some("10.0.0.9:40000"));
        assert_eq!(RemoteAddrKeyResolver.resolve(&req, &ctx), "10.0.0.9");
    }

    #[test]
    fn test_missing_remote_uses_fallback() {
        let (req, ctx) = request(&[], None);
        assert_eq!(RemoteAddrKeyResolver.resolve(&req, &ctx), FALLBACK_KEY);
        assert_eq!(ForwardedForKeyResolver.resolve(&req, &ctx), FALLBACK_KEY);
    }

    #[test]
    fn test_forwarded_for_precedence() {
        let (req, ctx) = request(
            &[("X-Forwarded-For", " 203.0.113.5, 10.0.0.1"), ("X-Real-IP", "198.51.100.2")],
            Some("10.0.0.9:40000"),
        );
        assert_eq!(ForwardedForKeyResolver.resolve(&req, &ctx), "203.0.113.5");

        let (req, ctx) = request(&[("X-Real-IP", "198.51.100.2")], Some("10.0.0.9:40000"));
        assert_eq!(ForwardedForKeyResolver.resolve(&req, &ctx), "198.51.100.2");

        let (req, ctx) = request(&[], Some("[::1]:40000"));
        assert_eq!(ForwardedForKeyResolver.resolve(&req, &ctx), "::1");
    }
}

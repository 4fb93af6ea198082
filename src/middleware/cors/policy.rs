use super::config::{normalize_origin, CorsConfig};
use crate::settings::SettingsError;
use hyper::header::{self, HeaderName, HeaderValue};
use hyper::{HeaderMap, Method};
use std::collections::HashSet;

/// 허용 메서드 (고정)
pub const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// 허용 요청 헤더 (고정)
pub const ALLOWED_HEADERS: [&str; 5] = [
    "Authorization",
    "Content-Type",
    "Accept",
    "X-Requested-With",
    "X-XSRF-TOKEN",
];

/// preflight 캐시 시간 기본값 (초)
pub const DEFAULT_MAX_AGE: u32 = 8000;

#[derive(Debug, Clone)]
enum AllowedOrigins {
    Any,
    List(HashSet<String>),
}

/// 요청마다 계산되는 CORS 판정. 저장되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsDecision {
    pub allowed: bool,
    pub allowed_origin: Option<String>,
    pub allowed_methods: Vec<Method>,
    pub allowed_headers: Vec<&'static str>,
    pub max_age_seconds: u32,
    pub allow_credentials: bool,
}

impl CorsDecision {
    fn denied(max_age_seconds: u32) -> Self {
        Self {
            allowed: false,
            allowed_origin: None,
            allowed_methods: ALLOWED_METHODS.to_vec(),
            allowed_headers: ALLOWED_HEADERS.to_vec(),
            max_age_seconds,
            allow_credentials: false,
        }
    }

    /// 일반 요청 응답에 CORS 헤더를 적용합니다. 이미 있는 헤더는 유지합니다.
    pub fn apply_actual(&self, headers: &mut HeaderMap) {
        let Some(origin) = self.allowed_origin.as_deref().filter(|_| self.allowed) else {
            return;
        };

        if let Ok(value) = HeaderValue::from_str(origin) {
            set_if_absent(headers, header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        if self.allow_credentials {
            set_if_absent(
                headers,
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        if origin != "*" {
            append_vary_origin(headers);
        }
    }

    /// preflight 응답에 필요한 헤더를 모두 적용합니다.
    pub fn apply_preflight(&self, headers: &mut HeaderMap) {
        if !self.allowed {
            return;
        }
        self.apply_actual(headers);

        let methods = self
            .allowed_methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        if let Ok(value) = HeaderValue::from_str(&methods) {
            set_if_absent(headers, header::ACCESS_CONTROL_ALLOW_METHODS, value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.allowed_headers.join(", ")) {
            set_if_absent(headers, header::ACCESS_CONTROL_ALLOW_HEADERS, value);
        }
        set_if_absent(
            headers,
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from(self.max_age_seconds),
        );
    }
}

fn set_if_absent(headers: &mut HeaderMap, name: HeaderName, value: HeaderValue) {
    headers.entry(name).or_insert(value);
}

fn append_vary_origin(headers: &mut HeaderMap) {
    let already = headers
        .get_all(header::VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|v| v.trim().eq_ignore_ascii_case("origin"));
    if !already {
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }
}

/// 상태 없는 CORS 평가기
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: AllowedOrigins,
    allow_credentials: bool,
    max_age: u32,
}

impl CorsPolicy {
    pub fn new(config: &CorsConfig) -> Result<Self, SettingsError> {
        config.validate()?;

        let origins = if config.is_wildcard() {
            AllowedOrigins::Any
        } else {
            let mut set = HashSet::new();
            for origin in &config.allowed_origins {
                let normalized = normalize_origin(origin).map_err(|reason| SettingsError::EnvVarInvalid {
                    var_name: "GATEWAY_CORS_ALLOWED_ORIGINS".to_string(),
                    value: origin.clone(),
                    reason,
                })?;
                set.insert(normalized);
            }
            AllowedOrigins::List(set)
        };

        Ok(Self {
            origins,
            allow_credentials: config.allow_credentials,
            max_age: config.max_age,
        })
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        match &self.origins {
            AllowedOrigins::Any => true,
            AllowedOrigins::List(set) => normalize_origin(origin)
                .map(|normalized| set.contains(&normalized))
                .unwrap_or(false),
        }
    }

    /// 요청된 헤더 목록(Access-Control-Request-Headers)이 모두 허용되는지
    pub fn headers_allowed(&self, requested: &str) -> bool {
        requested
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .all(|h| ALLOWED_HEADERS.iter().any(|allowed| allowed.eq_ignore_ascii_case(h)))
    }

    /// origin과 메서드에 대한 CORS 판정을 계산합니다.
    pub fn evaluate(&self, origin: Option<&str>, method: &Method) -> CorsDecision {
        let Some(origin) = origin else {
            return CorsDecision::denied(self.max_age);
        };
        if !ALLOWED_METHODS.contains(method) || !self.origin_allowed(origin) {
            return CorsDecision::denied(self.max_age);
        }

        let allowed_origin = match self.origins {
            AllowedOrigins::Any => "*".to_string(),
            AllowedOrigins::List(_) => origin.to_string(),
        };

        CorsDecision {
            allowed: true,
            allowed_origin: Some(allowed_origin),
            allowed_methods: ALLOWED_METHODS.to_vec(),
            allowed_headers: ALLOWED_HEADERS.to_vec(),
            max_age_seconds: self.max_age,
            allow_credentials: self.allow_credentials,
        }
    }
}

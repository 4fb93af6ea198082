use crate::middleware::RequestContext;
use crate::settings::logging::{LogFormat, LogOutput};
use crate::settings::LogSettings;
use std::path::Path;
use tracing::{error, info, span, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

fn build_filter(settings: &LogSettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_str().to_lowercase()))
}

/// 전역 구독자를 설치합니다.
///
/// 파일 출력을 사용하면 반환된 guard가 살아 있는 동안에만 로그가 기록됩니다.
pub fn init_logging(settings: &LogSettings) -> Option<WorkerGuard> {
    let (writer, guard) = match &settings.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::File(path) => {
            let path = Path::new(path);
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "gateway.log".to_string());
            tracing_appender::non_blocking(tracing_appender::rolling::daily(directory, file_name))
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(settings))
        .with_writer(writer)
        .with_ansi(matches!(settings.output, LogOutput::Stdout))
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // 이미 설치된 경우(테스트 등)는 무시
    let installed = match settings.format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Text => builder.try_init().is_ok(),
    };

    installed.then_some(guard)
}

/// 요청 하나의 접근 로그
#[derive(Debug)]
pub struct RequestLog {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub remote_addr: Option<String>,
    pub status_code: u16,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl RequestLog {
    pub fn new(ctx: &RequestContext) -> Self {
        Self {
            request_id: ctx.request_id.clone(),
            method: ctx.method.to_string(),
            path: ctx.path.clone(),
            remote_addr: ctx.remote_addr.map(|addr| addr.to_string()),
            status_code: 0,
            duration_ms: 0,
            error: None,
        }
    }

    pub fn with_response(&mut self, status: hyper::StatusCode) {
        self.status_code = status.as_u16();
    }

    pub fn with_error(&mut self, error: impl std::fmt::Display) {
        self.error = Some(error.to_string());
    }

    /// 기록할 로그 레벨
    pub fn level(&self) -> Level {
        if self.error.is_some() || self.status_code >= 500 {
            Level::ERROR
        } else if self.status_code >= 400 {
            Level::WARN
        } else {
            Level::INFO
        }
    }
}

pub fn log_request(log: &RequestLog) {
    let level = log.level();

    let span = span!(
        Level::INFO,
        "request",
        request_id = %log.request_id,
        method = %log.method,
        path = %log.path,
        status = %log.status_code,
        duration_ms = %log.duration_ms
    );
    let _enter = span.enter();

    match level {
        Level::ERROR => error!(
            remote_addr = ?log.remote_addr,
            error = ?log.error,
            "Request failed"
        ),
        Level::WARN => warn!(
            remote_addr = ?log.remote_addr,
            "Request completed with warning"
        ),
        _ => info!(
            remote_addr = ?log.remote_addr,
            "Request completed successfully"
        ),
    }
}

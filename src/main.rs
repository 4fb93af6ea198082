use banking_edge_gateway::{
    logging::init_logging,
    server::{RequestHandler, ServerListener},
    settings::Settings,
};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let settings = match Settings::load().await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load settings: {}", e);
            std::process::exit(1);
        }
    };

    let _guard = init_logging(&settings.logging);
    info!(profile = ?settings.profile, upstream = %settings.upstream.url, "게이트웨이 시작");

    let encryption_key = match settings.encryption.resolve(settings.profile) {
        Ok(key) => key,
        Err(e) => {
            error!(error = %e, "암호화 키 로드 실패");
            std::process::exit(1);
        }
    };
    info!(source = ?encryption_key.source(), "암호화 키 준비 완료");

    let handler = match RequestHandler::from_settings(&settings) {
        Ok(handler) => Arc::new(handler),
        Err(e) => {
            error!(error = %e, "요청 처리기 생성 실패");
            std::process::exit(1);
        }
    };

    let listener = match ServerListener::new(&settings).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "리스너 생성 실패");
            std::process::exit(1);
        }
    };

    tokio::select! {
        result = listener.run(handler) => {
            if let Err(e) = result {
                error!(error = %e, "서버 실행 실패");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("종료 신호 수신, 게이트웨이를 종료합니다");
        }
    }
}

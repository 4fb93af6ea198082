use super::{Request, RequestContext, Response};
use crate::error::GatewayError;
use async_trait::async_trait;

/// 요청 단계 처리 결과
#[derive(Debug)]
pub enum Flow {
    /// 다음 미들웨어로 (변경되었을 수 있는) 요청을 넘김
    Continue(Request),
    /// 응답이 확정됨. 이후 미들웨어와 백엔드 호출은 건너뜀
    Respond(Response),
}

/// 미들웨어 트레이트
///
/// 요청 단계는 체인 순서대로, 응답 단계는 역순으로 실행됩니다.
/// 요청 단계에서 반환한 에러는 체인이 `ErrorTranslator`로 한 번만 변환합니다.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// 미들웨어의 고유 이름을 반환합니다.
    fn name(&self) -> &'static str;

    /// HTTP 요청을 처리합니다.
    async fn handle_request(&self, req: Request, ctx: &mut RequestContext) -> Result<Flow, GatewayError>;

    /// HTTP 응답을 처리합니다.
    ///
    /// 상태 코드와 본문은 이미 확정된 상태이므로 없는 헤더를 추가하는 것만 허용됩니다.
    async fn handle_response(&self, res: Response, _ctx: &RequestContext) -> Response {
        res
    }
}

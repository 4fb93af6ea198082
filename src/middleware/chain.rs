use super::{ErrorTranslator, Flow, Middleware, Request, RequestContext, Response};
use crate::error::GatewayError;
use crate::proxy::Backend;
use tracing::{debug, instrument};

/// 순서가 고정된 미들웨어 체인
///
/// 요청 단계는 추가된 순서대로 실행하고, 어느 미들웨어든 응답을 확정하거나
/// 에러를 반환하면 그 자리에서 멈춥니다. 응답 단계는 결과와 관계없이 모든
/// 미들웨어에 대해 역순으로 실행됩니다.
#[derive(Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Box<dyn Middleware>>,
    translator: ErrorTranslator,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
            translator: ErrorTranslator::new(),
        }
    }

    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
    }

    pub fn add_boxed(&mut self, middleware: Box<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// 실행 순서대로 미들웨어 이름을 반환합니다.
    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    /// 요청 하나를 끝까지 처리합니다. 항상 응답을 반환합니다.
    #[instrument(skip_all, fields(request_id = %ctx.request_id, method = %ctx.method, path = %ctx.path))]
    pub async fn execute(
        &self,
        req: Request,
        ctx: &mut RequestContext,
        backend: &dyn Backend,
    ) -> Response {
        let response = match self.execute_request_chain(req, ctx, backend).await {
            Ok(response) => response,
            Err(err) => self.translator.translate(&err, ctx),
        };
        self.execute_response_chain(response, ctx).await
    }

    /// 체인 밖에서 발생한 실패(본문 수신)를 같은 방식으로 응답합니다.
    pub async fn reject(&self, err: &GatewayError, ctx: &RequestContext) -> Response {
        let response = self.translator.translate(err, ctx);
        self.execute_response_chain(response, ctx).await
    }

    async fn execute_request_chain(
        &self,
        mut request: Request,
        ctx: &mut RequestContext,
        backend: &dyn Backend,
    ) -> Result<Response, GatewayError> {
        for middleware in &self.middlewares {
            match middleware.handle_request(request, ctx).await? {
                Flow::Continue(next) => request = next,
                Flow::Respond(response) => {
                    debug!(middleware = middleware.name(), status = %response.status(), "체인 단락");
                    return Ok(response);
                }
            }
        }

        backend.forward(request, ctx).await
    }

    async fn execute_response_chain(&self, mut response: Response, ctx: &RequestContext) -> Response {
        // 응답은 역순으로 처리
        for middleware in self.middlewares.iter().rev() {
            response = middleware.handle_response(response, ctx).await;
        }
        response
    }
}

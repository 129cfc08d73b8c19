//! WebSocket 升级请求 authorizer
//!
//! 校验子协议与 `access_token`，通过时返回 Allow 策略并把用户 ID 放入上下文；
//! 失败时以固定信息 `Unauthorized` 结束调用。

use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use notify_gateway::ApplicationBootstrap;
use notify_gateway::interface::authorizer::UNAUTHORIZED;
use notify_gateway::interface::AuthorizerRequest;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let context = ApplicationBootstrap::initialize().await?;
    let handler = context.handler;

    run(service_fn(move |event: LambdaEvent<AuthorizerRequest>| {
        let handler = handler.clone();
        async move {
            handler
                .authorize(event.payload)
                .await
                .map_err(|_| Error::from(UNAUTHORIZED))
        }
    }))
    .await
}

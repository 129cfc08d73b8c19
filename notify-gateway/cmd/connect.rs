//! `$connect` 路由：认证并登记连接

use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use notify_gateway::ApplicationBootstrap;
use notify_gateway::interface::WebSocketRequest;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let context = ApplicationBootstrap::initialize().await?;
    let handler = context.handler;

    run(service_fn(move |event: LambdaEvent<WebSocketRequest>| {
        let handler = handler.clone();
        async move { Ok::<_, Error>(handler.connect(event.payload).await) }
    }))
    .await
}

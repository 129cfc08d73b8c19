//! 通知推送函数
//!
//! 消费队列批次，按 `detail.user_id` 查找连接并逐个推送。

use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use notify_push::ApplicationBootstrap;
use notify_push::interface::QueueEvent;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let context = ApplicationBootstrap::initialize().await?;
    let handler = context.handler;

    run(service_fn(move |event: LambdaEvent<QueueEvent>| {
        let handler = handler.clone();
        async move { Ok::<_, Error>(handler.handle(event.payload).await) }
    }))
    .await
}

//! Minimal runner demo: two ticking processes and a closer, stopped with
//! ctrl-c.

use std::time::Duration;

use floodmesh_runner::Runner;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    Runner::new()
        .with_named_process("fast-ticker", |ctx| async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => break,
                    _ = ticker.tick() => tracing::info!("fast tick"),
                }
            }
            Ok(())
        })
        .with_named_process("slow-ticker", |ctx| async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(3));
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => break,
                    _ = ticker.tick() => tracing::info!("slow tick"),
                }
            }
            Ok(())
        })
        .with_closer(|| async move {
            tracing::info!("flushing before exit");
            Ok(())
        })
        .run()
        .await;
}

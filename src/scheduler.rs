use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Source of the politeness pause between fetched links.
pub trait Scheduler {
    fn pause(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// Real-time pauses on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            sleep(duration).await;
        }
    }
}

use std::time::Duration;

use async_trait::async_trait;
use skyfollow_core::ports::Sleeper;
use tracing::trace;

/// Pauses the current task with `tokio::time::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        trace!(secs = duration.as_secs_f64(), "sleeping");
        tokio::time::sleep(duration).await;
    }
}

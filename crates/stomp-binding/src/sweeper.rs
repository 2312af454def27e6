//! Periodic eviction of stale pending frames.
//!
//! Only does work when `pending_frame_ttl_secs` is configured. Frames whose
//! connection dropped without an explicit disconnect would otherwise sit in
//! the tracker forever.

use std::time::Duration;

use tokio::time;

use crate::state::StompBinding;

/// Run the sweep loop, calling `evict_stale` every `interval`.
///
/// This function runs forever until the task is cancelled. Intended
/// to be spawned as a background tokio task.
pub async fn run(binding: StompBinding, interval: Duration) {
    if binding.config().pending_frame_ttl_secs.is_none() {
        tracing::debug!("no pending frame TTL configured, sweeper idle");
        std::future::pending::<()>().await;
    }

    let mut ticker = time::interval(interval);
    // Skip the first tick (fires immediately).
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let evicted = binding.evict_stale().await;
        tracing::trace!(evicted, "sweep finished");
    }
}

/// Spawn `run` with the configured interval.
pub fn spawn(binding: &StompBinding) -> tokio::task::JoinHandle<()> {
    let interval = Duration::from_secs(binding.config().sweep_interval_secs.max(1));
    tokio::spawn(run(binding.clone(), interval))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BindingConfig, ConnectOptions};
    use std::sync::Arc;
    use stomp_protocol::Frame;
    use stomp_transport::MockConnector;

    #[tokio::test]
    async fn sweeper_evicts_after_interval() {
        let connector = Arc::new(MockConnector::new());
        let config = BindingConfig {
            pending_frame_ttl_secs: Some(0),
            ..Default::default()
        };
        let binding = StompBinding::new(connector.clone(), config);
        let conn = binding
            .connect("device1", ConnectOptions::new("broker.local"))
            .await
            .unwrap()
            .success()
            .unwrap()
            .connection_id;
        connector
            .last_session()
            .unwrap()
            .push_frame(Frame::message("/queue/a", "m-1", "x"));
        binding
            .read_frame(&conn, Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(binding.pending_count().await, 1);

        let handle = tokio::spawn(run(binding.clone(), Duration::from_millis(20)));
        time::sleep(Duration::from_millis(200)).await;

        assert_eq!(binding.pending_count().await, 0);
        handle.abort();
    }
}

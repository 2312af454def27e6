//! Concurrent use of one binding from many tasks.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use helpers::TestHarness;
use stomp_binding::{ConnectOptions, StompBinding, SubscribeOptions};
use stomp_transport::{
    Connector, MockConnector, OpenRequest, OpenedSession, TransportResult,
};

/// A blocked read on one connection does not stall the others.
#[tokio::test]
async fn blocked_read_does_not_stall_other_connections() {
    let h = TestHarness::new();
    let slow = h.connect("device1", "broker.local").await;
    let fast = h.connect("device2", "broker.local").await;
    h.session(0).block_reads(true);
    h.deliver(1, "s", "m-1", "hello");

    let binding = h.binding.clone();
    let slow_id = slow.clone();
    let blocked = tokio::spawn(async move {
        binding
            .read_frame(&slow_id, Some(Duration::from_secs(2)))
            .await
    });

    let msg = tokio::time::timeout(Duration::from_millis(500), h.read(&fast))
        .await
        .expect("read on the other connection must not wait")
        .unwrap();
    assert_eq!(msg.body, "hello");
    assert!(h.binding.ack(&msg.message_id, &fast).await.unwrap().is_success());

    // Stats and subscribe on the blocked connection are still served.
    h.binding
        .subscribe(&slow, "/topic/x", SubscribeOptions::default())
        .await
        .unwrap();
    assert_eq!(
        h.binding.get_connection_stats(&slow).await.unwrap().subscriptions_count,
        1
    );

    let timed_out = blocked.await.unwrap().unwrap().success().unwrap();
    assert!(timed_out.frame.is_none());
}

/// One reader task per connection, all draining concurrently.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reader_task_per_connection() {
    let h = TestHarness::new();
    let mut conns = Vec::new();
    for i in 0..8 {
        let conn = h.connect(&format!("device{i}"), "broker.local").await;
        let sub = h
            .binding
            .subscribe(&conn, "/topic/events", SubscribeOptions::default())
            .await
            .unwrap()
            .success()
            .unwrap()
            .subscription_id;
        for m in 0..10 {
            h.deliver(i, sub.as_str(), &format!("c{i}-m{m}"), "x");
        }
        conns.push((conn, sub));
    }

    let mut tasks = Vec::new();
    for (conn, _) in &conns {
        let binding = h.binding.clone();
        let conn = conn.clone();
        tasks.push(tokio::spawn(async move {
            let mut acked = 0;
            loop {
                let read = binding
                    .read_frame(&conn, Some(Duration::from_millis(50)))
                    .await
                    .unwrap()
                    .success()
                    .unwrap();
                let Some(msg) = read.frame else { break };
                assert!(binding.ack(&msg.message_id, &conn).await.unwrap().is_success());
                acked += 1;
            }
            acked
        }));
    }

    for task in tasks {
        assert_eq!(task.await.unwrap(), 10);
    }
    for (_, sub) in &conns {
        assert_eq!(h.binding.get_subscription(sub).await.unwrap().message_count, 10);
    }
    assert_eq!(h.binding.pending_count().await, 0);
}

/// Concurrent acks of the same frame: exactly one wins.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_ack_settles_once() {
    let h = TestHarness::new();
    let conn = h.connect("device1", "broker.local").await;
    h.deliver(0, "s", "m-1", "x");
    let msg = h.read(&conn).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let binding = h.binding.clone();
        let conn = conn.clone();
        let id = msg.message_id.clone();
        tasks.push(tokio::spawn(async move { binding.ack(&id, &conn).await }));
    }

    let mut ok = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(outcome) => {
                assert!(outcome.is_success());
                ok += 1;
            }
            Err(e) => assert!(e.is_not_found()),
        }
    }
    assert_eq!(ok, 1);
}

/// Connector that holds opens to `gated_host` until released.
struct GatedConnector {
    inner: MockConnector,
    gated_host: &'static str,
    gate: Notify,
}

#[async_trait]
impl Connector for GatedConnector {
    async fn open(&self, request: &OpenRequest) -> TransportResult<OpenedSession> {
        if request.address.host == self.gated_host {
            self.gate.notified().await;
        }
        self.inner.open(request).await
    }
}

/// A connect waiting on the broker holds no registry lock.
#[tokio::test]
async fn slow_connect_does_not_block_other_operations() {
    let connector = Arc::new(GatedConnector {
        inner: MockConnector::new(),
        gated_host: "slow.local",
        gate: Notify::new(),
    });
    let binding = StompBinding::with_connector(connector.clone());

    let pending_connect = {
        let binding = binding.clone();
        tokio::spawn(async move {
            binding
                .connect("device1", ConnectOptions::new("slow.local"))
                .await
        })
    };
    tokio::task::yield_now().await;

    let fast = tokio::time::timeout(
        Duration::from_millis(500),
        binding.connect("device2", ConnectOptions::new("fast.local")),
    )
    .await
    .expect("second connect must not wait for the first")
    .unwrap()
    .success()
    .unwrap();
    assert_eq!(binding.list_connections(None).await.len(), 1);
    assert_eq!(fast.server, "fast.local:61613");

    connector.gate.notify_one();
    assert!(pending_connect.await.unwrap().unwrap().is_success());
    assert_eq!(binding.connection_count().await, 2);
}

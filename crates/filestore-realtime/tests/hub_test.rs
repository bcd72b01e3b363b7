//! Integration tests for hub registration, fan-out, eviction, and shutdown.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;

use filestore_core::config::RealtimeConfig;
use filestore_realtime::{
    CloseReason, ConnectionId, Hub, HubError, HubState, Subscriber, Update, UpdateKind,
};

const DEADLINE: Duration = Duration::from_secs(5);

fn hub(queue_capacity: usize, announce_presence: bool) -> Hub {
    let hub = Hub::new(RealtimeConfig {
        queue_capacity,
        announce_presence,
        ..RealtimeConfig::default()
    });
    hub.start().expect("start hub");
    hub
}

fn numbered(n: usize) -> Update {
    Update::new(UpdateKind::LogEntry, json!({ "n": n }))
}

/// Reads until the queue is closed and empty.
async fn collect_until_closed(subscriber: &mut Subscriber) -> Vec<Arc<Update>> {
    let mut updates = Vec::new();
    while let Some(update) = timeout(DEADLINE, subscriber.recv())
        .await
        .expect("queue should close")
    {
        updates.push(update);
    }
    updates
}

#[tokio::test]
async fn test_register_publish_unregister_evict_scenario() {
    let hub = hub(4, false);
    let mut a = hub.register("A").await.expect("register A");
    let mut b = hub.register("B").await.expect("register B");

    hub.publish(Update::new(UpdateKind::FileUploaded, json!({ "key": "x" })))
        .expect("publish");
    hub.flush().await.expect("flush");

    for sub in [&mut a, &mut b] {
        let got = sub.drain();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].kind, UpdateKind::FileUploaded);
        assert_eq!(got[0].payload, json!({ "key": "x" }));
    }

    hub.unregister("A").expect("unregister");
    hub.publish(Update::new(UpdateKind::FileDeleted, json!({ "key": "x" })))
        .expect("publish");
    hub.flush().await.expect("flush");

    assert!(collect_until_closed(&mut a).await.is_empty());
    assert_eq!(a.close_reason(), Some(CloseReason::Unregistered));
    let got = b.drain();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].kind, UpdateKind::FileDeleted);

    for n in 0..5 {
        hub.publish(numbered(n)).expect("publish");
    }
    hub.flush().await.expect("flush");

    assert_eq!(hub.connection_count(), 0);
    assert_eq!(b.close_reason(), Some(CloseReason::Evicted));
    let kept: Vec<_> = collect_until_closed(&mut b)
        .await
        .iter()
        .map(|u| u.payload["n"].clone())
        .collect();
    assert_eq!(kept, vec![json!(0), json!(1), json!(2), json!(3)]);
    assert_eq!(hub.metrics().connections_evicted, 1);
}

#[tokio::test]
async fn test_overflow_evicts_only_the_slow_subscriber() {
    let hub = hub(8, true);
    let _slow = hub.register("slow").await.expect("register slow");
    let mut fast = hub.register("fast").await.expect("register fast");
    hub.flush().await.expect("flush");
    assert!(fast.drain().is_empty(), "fast joined last; nobody to announce to it");

    let total = 20;
    let mut received = Vec::new();
    for n in 0..total {
        hub.publish(numbered(n)).expect("publish");
        hub.flush().await.expect("flush");
        received.extend(fast.drain());
    }

    assert!(!hub.is_connected(&"slow".into()));
    assert!(hub.is_connected(&"fast".into()));

    let numbers: Vec<_> = received
        .iter()
        .filter(|u| u.kind == UpdateKind::LogEntry)
        .map(|u| u.payload["n"].as_u64().expect("n"))
        .collect();
    assert_eq!(numbers, (0..total as u64).collect::<Vec<_>>());

    let departures: Vec<_> = received
        .iter()
        .filter(|u| u.kind == UpdateKind::UserLeft)
        .collect();
    assert_eq!(departures.len(), 1);
    assert_eq!(departures[0].payload, json!("slow"));
}

#[tokio::test]
async fn test_departure_announcement_cascades_evictions() {
    let hub = hub(3, true);
    let mut a = hub.register("a").await.expect("register a");
    let mut b = hub.register("b").await.expect("register b");
    let mut c = hub.register("c").await.expect("register c");
    hub.flush().await.expect("flush");
    // a holds joined(b), joined(c); b holds joined(c); c holds nothing.
    assert!(c.drain().is_empty());

    hub.publish(numbered(1)).expect("publish");
    hub.flush().await.expect("flush");
    // a is now full and b is one slot short.
    assert_eq!(c.drain().len(), 1);

    hub.publish(numbered(2)).expect("publish");
    hub.flush().await.expect("cascade completes");

    assert_eq!(hub.connection_ids(), vec![ConnectionId::from("c")]);
    assert_eq!(a.close_reason(), Some(CloseReason::Evicted));
    assert_eq!(b.close_reason(), Some(CloseReason::Evicted));
    assert_eq!(hub.metrics().connections_evicted, 2);
    assert_eq!(collect_until_closed(&mut a).await.len(), 3);
    assert_eq!(collect_until_closed(&mut b).await.len(), 3);

    let got = c.drain();
    assert_eq!(got.len(), 3);
    assert_eq!(got[0].payload, json!({ "n": 2 }));
    assert_eq!(got[1].kind, UpdateKind::UserLeft);
    assert_eq!(got[1].payload, json!("a"));
    assert_eq!(got[2].kind, UpdateKind::UserLeft);
    assert_eq!(got[2].payload, json!("b"));
}

#[tokio::test]
async fn test_per_connection_fifo() {
    let hub = hub(256, false);
    let mut sub = hub.register("a").await.expect("register");

    for n in 0..200 {
        hub.publish(numbered(n)).expect("publish");
    }
    hub.flush().await.expect("flush");

    let order: Vec<_> = sub
        .drain()
        .iter()
        .map(|u| u.payload["n"].as_u64().expect("n"))
        .collect();
    assert_eq!(order, (0..200).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_publishers_deliver_exactly_once() {
    let tasks = 8;
    let per_task = 25;
    let hub = hub(tasks * per_task, false);

    let mut subscribers = Vec::new();
    for id in ["a", "b", "c"] {
        subscribers.push(hub.register(id).await.expect("register"));
    }

    let mut producers = Vec::new();
    for t in 0..tasks {
        let hub = hub.clone();
        producers.push(tokio::spawn(async move {
            for n in 0..per_task {
                hub.publish(Update::new(UpdateKind::LogEntry, json!({ "t": t, "n": n })))
                    .expect("publish");
                tokio::task::yield_now().await;
            }
        }));
    }
    for producer in producers {
        producer.await.expect("producer");
    }
    hub.flush().await.expect("flush");

    for sub in &mut subscribers {
        let updates = sub.drain();
        assert_eq!(updates.len(), tasks * per_task);

        let unique: HashSet<_> = updates.iter().map(|u| u.payload.to_string()).collect();
        assert_eq!(unique.len(), tasks * per_task, "no duplicates");

        for t in 0..tasks {
            let seen: Vec<_> = updates
                .iter()
                .filter(|u| u.payload["t"] == json!(t))
                .map(|u| u.payload["n"].as_u64().expect("n"))
                .collect();
            assert_eq!(seen, (0..per_task as u64).collect::<Vec<_>>());
        }
    }
}

#[tokio::test]
async fn test_presence_announcements() {
    let hub = hub(16, true);
    let mut a = hub.register("a").await.expect("register a");
    let mut b = hub.register("b").await.expect("register b");
    hub.flush().await.expect("flush");

    let got = a.drain();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].kind, UpdateKind::UserJoined);
    assert_eq!(got[0].payload, json!("b"));
    assert!(b.drain().is_empty(), "a joiner is not told about itself");

    hub.unregister("b").expect("unregister");
    hub.flush().await.expect("flush");

    let got = a.drain();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].kind, UpdateKind::UserLeft);
    assert!(
        collect_until_closed(&mut b).await.is_empty(),
        "removed before the announcement"
    );
}

#[tokio::test]
async fn test_unregister_unknown_is_noop() {
    let hub = hub(4, true);
    let mut a = hub.register("a").await.expect("register");
    hub.unregister("nobody").expect("unregister");
    hub.flush().await.expect("flush");
    assert!(a.drain().is_empty());
    assert_eq!(hub.connection_count(), 1);
}

#[tokio::test]
async fn test_publish_never_blocks_on_a_stalled_subscriber() {
    let hub = hub(1, false);
    let _stalled = hub.register("stalled").await.expect("register");

    timeout(Duration::from_millis(500), async {
        for n in 0..10_000 {
            hub.publish(numbered(n)).expect("publish");
        }
        hub.flush().await.expect("flush");
    })
    .await
    .expect("publishing must not wait on subscribers");

    assert_eq!(hub.connection_count(), 0);
}

#[tokio::test]
async fn test_operations_after_stop_fail_fast() {
    let hub = hub(4, false);
    let mut a = hub.register("a").await.expect("register");
    hub.stop().await;

    assert_eq!(hub.state(), HubState::Stopped);
    assert_eq!(hub.connection_count(), 0);
    assert_eq!(a.close_reason(), Some(CloseReason::HubStopped));
    assert!(collect_until_closed(&mut a).await.is_empty());

    let register = timeout(DEADLINE, hub.register("b"))
        .await
        .expect("register must not block");
    assert!(matches!(register, Err(HubError::HubStopped)));
    assert!(matches!(hub.publish(numbered(0)), Err(HubError::HubStopped)));
    assert!(matches!(hub.unregister("a"), Err(HubError::HubStopped)));
    assert!(matches!(hub.send_to_one("a", numbered(0)), Err(HubError::HubStopped)));
    assert!(matches!(hub.flush().await, Err(HubError::HubStopped)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_during_publish_delivers_every_accepted_update() {
    let hub = hub(1 << 20, false);
    let mut sub = hub.register("a").await.expect("register");

    let mut producers = Vec::new();
    for t in 0..4 {
        let hub = hub.clone();
        producers.push(tokio::spawn(async move {
            let mut accepted = 0usize;
            for n in 0..5_000 {
                match hub.publish(Update::new(UpdateKind::LogEntry, json!({ "t": t, "n": n }))) {
                    Ok(()) => accepted += 1,
                    Err(HubError::HubStopped) => break,
                    Err(other) => panic!("unexpected error: {other}"),
                }
                if n % 64 == 0 {
                    tokio::task::yield_now().await;
                }
            }
            accepted
        }));
    }

    tokio::time::sleep(Duration::from_millis(2)).await;
    hub.stop().await;

    let mut accepted = 0;
    for producer in producers {
        accepted += timeout(DEADLINE, producer)
            .await
            .expect("producer finishes")
            .expect("producer");
    }

    let delivered = collect_until_closed(&mut sub).await.len();
    assert_eq!(delivered, accepted);
}

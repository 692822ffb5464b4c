mod common;

use std::sync::Arc;

use brigade_core::status::ConnectionPhase;
use brigade_core::target::Target;
use brigade_stream::TargetBinding;
use common::*;
use parking_lot::Mutex;

// ---------------------------------------------------------------------------
// Mount
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn mount_connects_idle_target() {
    let connector = FakeConnector::new();
    let _feed = connector.push_stream();
    let registry = registry_with(Arc::clone(&connector));

    let binding = TargetBinding::builder(registry.clone(), Target::Kitchen).mount();
    eventually(|| binding.status().connected).await;

    assert_eq!(binding.target(), Target::Kitchen);
    assert_eq!(connector.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn second_binding_shares_the_connection() {
    let connector = FakeConnector::new();
    let _feed = connector.push_stream();
    let registry = registry_with(Arc::clone(&connector));

    let first = TargetBinding::builder(registry.clone(), Target::Service).mount();
    eventually(|| first.status().connected).await;
    let second = TargetBinding::builder(registry.clone(), Target::Service).mount();

    assert!(second.status().connected);
    settle().await;
    assert_eq!(connector.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn watch_status_wakes_on_change() {
    let connector = FakeConnector::new();
    let _feed = connector.push_stream();
    let registry = registry_with(connector);

    let binding = TargetBinding::builder(registry.clone(), Target::Kitchen).mount();
    let mut rx = binding.watch_status();
    while !rx.borrow_and_update().connected {
        rx.changed().await.expect("binding alive");
    }

    binding.disconnect();
    rx.changed().await.expect("binding alive");
    assert_eq!(rx.borrow().phase(), ConnectionPhase::Idle);
}

// ---------------------------------------------------------------------------
// Event buffer
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn events_buffered_newest_first_and_capped() {
    let connector = FakeConnector::new();
    let feed = connector.push_stream();
    let registry = registry_with(connector);

    let binding = TargetBinding::builder(registry.clone(), Target::Kitchen)
        .max_events(3)
        .mount();
    eventually(|| binding.status().connected).await;

    for id in 1..=5 {
        send_line(&feed, &domain_json("order_created", "kitchen", &id.to_string()));
    }
    eventually(|| binding.events().first().is_some_and(|e| e.payload.order_id == "5")).await;

    let ids: Vec<String> = binding
        .events()
        .into_iter()
        .map(|e| e.payload.order_id)
        .collect();
    assert_eq!(ids, vec!["5", "4", "3"]);

    binding.clear_events();
    assert!(binding.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn callbacks_receive_events_system_frames_and_status() {
    let connector = FakeConnector::new();
    let feed = connector.push_stream();
    let registry = registry_with(connector);

    let log = Arc::new(Mutex::new(Vec::new()));
    let (events, system, status) = (Arc::clone(&log), Arc::clone(&log), Arc::clone(&log));
    let binding = TargetBinding::builder(registry.clone(), Target::Kitchen)
        .on_event(move |e| events.lock().push(format!("event:{}", e.payload.order_id)))
        .on_system(move |s| system.lock().push(format!("system:{}", s.message)))
        .on_status(move |s| status.lock().push(format!("status:{:?}", s.phase())))
        .mount();
    eventually(|| binding.status().connected).await;

    send_line(&feed, &heartbeat_json());
    send_line(&feed, &domain_json("order_ready_to_serve", "all", "7"));
    eventually(|| log.lock().len() == 4).await;

    assert_eq!(
        *log.lock(),
        vec![
            "status:Connecting",
            "status:Connected",
            "system:heartbeat",
            "event:7"
        ]
    );
}

// ---------------------------------------------------------------------------
// Unmount
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn drop_unsubscribes_but_keeps_connection() {
    let connector = FakeConnector::new();
    let feed = connector.push_stream();
    let registry = registry_with(connector);

    let count = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&count);
    let binding = TargetBinding::builder(registry.clone(), Target::Kitchen)
        .on_event(move |_| *counter.lock() += 1)
        .mount();
    eventually(|| binding.status().connected).await;

    send_line(&feed, &domain_json("order_created", "kitchen", "before"));
    eventually(|| *count.lock() == 1).await;
    drop(binding);

    let witness = TargetBinding::builder(registry.clone(), Target::Kitchen).mount();
    send_line(&feed, &domain_json("order_created", "kitchen", "after"));
    eventually(|| witness.events().len() == 1).await;

    assert_eq!(*count.lock(), 1);
    assert!(registry.connection_status(Target::Kitchen).connected);
}

// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! End-to-end tests for the arbitrator: events flow in through sources,
//! the allocation pass runs, reclaim follows the cooling-off period, and
//! admission answers from the shared cache.

use std::sync::Arc;
use std::time::Duration;

use fairshare_arbiter::allocator::DrfAllocator;
use fairshare_arbiter::arbiter::Arbiter;
use fairshare_arbiter::cache::ClusterState;
use fairshare_arbiter::reclaim::ReclaimWorker;
use fairshare_arbiter::types::PodInfo;
use fairshare_client::source::EventSource;
use fairshare_common::api::{ConsumerObject, Node, ObjectMeta, Pod, PodPhase, WatchEvent};
use fairshare_common::config::ArbiterConfig;
use fairshare_common::resource::Resource;
use fairshare_test_utils::mock_clients::{CapturingEventRecorder, FakeConsumerApi, FakePodApi};
use fairshare_test_utils::{init_test_logging, make_node, make_pod};
use parking_lot::Mutex;

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * MIB;

struct Harness {
    arbiter: Arc<Arbiter>,
    worker: Arc<ReclaimWorker>,
    consumer_api: FakeConsumerApi,
    pod_api: FakePodApi,
    pods: Arc<EventSource<Pod>>,
    nodes: Arc<EventSource<Node>>,
    consumers: Arc<EventSource<ConsumerObject>>,
}

fn harness(config: ArbiterConfig) -> Harness {
    init_test_logging();

    let state = Arc::new(Mutex::new(ClusterState::new(&config)));
    let consumer_api = FakeConsumerApi::new();
    let pod_api = FakePodApi::new();

    let arbiter = Arbiter::new(
        Arc::clone(&state),
        Box::new(DrfAllocator::new()),
        Arc::new(consumer_api.clone()),
        config.clone(),
    );
    let worker = ReclaimWorker::new(
        state,
        Arc::new(pod_api.clone()),
        Arc::new(CapturingEventRecorder::new()),
        config,
    );

    let pods = Arc::new(EventSource::new());
    let nodes = Arc::new(EventSource::new());
    let consumers = Arc::new(EventSource::new());
    arbiter.register_pod_source(&pods);
    arbiter.register_node_source(&nodes);
    arbiter.register_consumer_source(&consumers);

    Harness {
        arbiter,
        worker,
        consumer_api,
        pod_api,
        pods,
        nodes,
        consumers,
    }
}

fn test_config() -> ArbiterConfig {
    ArbiterConfig {
        reclaim_cooldown: Duration::from_millis(300),
        reclaim_retry_delay: Duration::from_millis(100),
        // Ticks are driven explicitly; do not rate-limit them.
        eviction_qps: 0.0,
        ..Default::default()
    }
}

fn consumer_object(name: &str) -> ConsumerObject {
    ConsumerObject {
        metadata: ObjectMeta::named("", name),
        ..Default::default()
    }
}

fn deserved_of(harness: &Harness, name: &str) -> Option<Resource> {
    let state = harness.arbiter.state();
    let deserved = state.lock().consumers[name].deserved;
    deserved
}

/// Scenario: an empty cluster allocates nothing and reclaims nothing.
#[tokio::test]
async fn test_empty_cluster() {
    let h = harness(test_config());

    h.consumers
        .apply(WatchEvent::Added(consumer_object("tenant-a")));
    h.pods.apply(WatchEvent::Added(make_pod(
        "tenant-a",
        "p1",
        PodPhase::Pending,
        2000.0,
        20.0 * MIB,
    )));

    h.arbiter.allocate_once().await;

    assert_eq!(deserved_of(&h, "tenant-a"), Some(Resource::empty()));
    let state = h.arbiter.state();
    assert!(state.lock().reclaim_queue.is_empty());
    assert_eq!(h.consumer_api.num_updates(), 1);
}

/// Scenario: two consumers with one identical pod each split fairly.
#[tokio::test]
async fn test_single_fair_split() {
    let h = harness(test_config());

    for i in 0..3 {
        h.nodes.apply(WatchEvent::Added(make_node(
            &format!("n{i}"),
            8000.0,
            2.0 * GIB,
        )));
    }
    h.consumers
        .apply(WatchEvent::Added(consumer_object("tenant-a")));
    h.consumers
        .apply(WatchEvent::Added(consumer_object("tenant-b")));
    h.pods.apply(WatchEvent::Added(make_pod(
        "tenant-a",
        "p1",
        PodPhase::Pending,
        2000.0,
        20.0 * MIB,
    )));
    h.pods.apply(WatchEvent::Added(make_pod(
        "tenant-b",
        "p1",
        PodPhase::Running,
        2000.0,
        20.0 * MIB,
    )));

    h.arbiter.allocate_once().await;

    let expected = Resource::new(2000.0, 20.0 * MIB);
    assert_eq!(deserved_of(&h, "tenant-a"), Some(expected));
    assert_eq!(deserved_of(&h, "tenant-b"), Some(expected));
    let state = h.arbiter.state();
    assert!(state.lock().reclaim_queue.is_empty());
}

/// Scenario: an overbooked consumer is reclaimed down to its deserved
/// share, in FIFO order, only after the cooling-off period.
#[tokio::test]
async fn test_reclaim_trigger() {
    let h = harness(test_config());

    for i in 0..3 {
        h.nodes.apply(WatchEvent::Added(make_node(
            &format!("n{i}"),
            8000.0,
            2.0 * GIB,
        )));
    }
    h.consumers
        .apply(WatchEvent::Added(consumer_object("tenant-a")));
    h.consumers
        .apply(WatchEvent::Added(consumer_object("tenant-b")));

    // tenant-b overbooked past the whole cluster: 12 running pods the
    // scheduler let through before arbitration kicked in.
    for i in 0..12 {
        h.pods.apply(WatchEvent::Added(make_pod(
            "tenant-b",
            &format!("p{i}"),
            PodPhase::Running,
            2000.0,
            512.0 * MIB,
        )));
    }
    for i in 0..2 {
        h.pods.apply(WatchEvent::Added(make_pod(
            "tenant-a",
            &format!("p{i}"),
            PodPhase::Pending,
            2000.0,
            20.0 * MIB,
        )));
    }

    h.arbiter.allocate_once().await;

    // tenant-a's demand is served; tenant-b deserves only the remainder.
    assert_eq!(
        deserved_of(&h, "tenant-a"),
        Some(Resource::new(4000.0, 40.0 * MIB))
    );
    assert_eq!(
        deserved_of(&h, "tenant-b"),
        Some(Resource::new(20000.0, 5.0 * GIB))
    );
    {
        let state = h.arbiter.state();
        let guard = state.lock();
        assert!(guard.reclaim_queue.contains(&"tenant-b".to_string()));
        assert!(!guard.reclaim_queue.contains(&"tenant-a".to_string()));
    }

    // Within the cooling-off period nothing is terminated.
    h.worker.reclaim_once().await;
    assert_eq!(h.pod_api.num_unbinds(), 0);

    tokio::time::sleep(Duration::from_millis(350)).await;
    h.worker.reclaim_once().await;

    // Two pods cover the (4000, 1 GiB) overage, oldest first.
    assert_eq!(h.pod_api.unbound(), vec!["tenant-b/p0", "tenant-b/p1"]);
    {
        let state = h.arbiter.state();
        let guard = state.lock();
        let b = &guard.consumers["tenant-b"];
        assert!(b.reclaim_wanted().is_empty());
        assert_eq!(b.terminating, Resource::new(4000.0, 1.0 * GIB));
        assert_eq!(b.terminating_pods.len(), 2);
        assert_eq!(b.running_pods.len(), 10);
    }

    // The delete events for the victims settle the terminating set.
    for name in ["p0", "p1"] {
        h.pods.apply(WatchEvent::Deleted(make_pod(
            "tenant-b",
            name,
            PodPhase::Running,
            2000.0,
            512.0 * MIB,
        )));
    }
    {
        let state = h.arbiter.state();
        let guard = state.lock();
        let b = &guard.consumers["tenant-b"];
        assert_eq!(b.terminating, Resource::empty());
        assert!(b.terminating_pods.is_empty());
    }
}

/// Scenario: admission is a strict greater-than check; ties pass.
#[tokio::test]
async fn test_admission() {
    let h = harness(test_config());

    h.consumers
        .apply(WatchEvent::Added(consumer_object("tenant-a")));
    {
        let state = h.arbiter.state();
        let mut guard = state.lock();
        let consumer = guard.consumers.get_mut("tenant-a").unwrap();
        consumer.allocated = Resource::new(2000.0, 20.0 * MIB);
        consumer.deserved = Some(Resource::new(2000.0, 20.0 * MIB));
    }

    let tiny = PodInfo::new(&make_pod("tenant-a", "tiny", PodPhase::Pending, 1.0, 1.0));
    assert!(!h.arbiter.allocatable(&tiny));

    let zero = PodInfo::new(&make_pod("tenant-a", "zero", PodPhase::Pending, 0.0, 0.0));
    assert!(h.arbiter.allocatable(&zero));
}

/// Admission denies until the first allocation pass has run.
#[tokio::test]
async fn test_admission_before_first_pass() {
    let h = harness(test_config());
    h.consumers
        .apply(WatchEvent::Added(consumer_object("tenant-a")));

    let probe = PodInfo::new(&make_pod("tenant-a", "probe", PodPhase::Pending, 0.0, 0.0));
    assert!(!h.arbiter.allocatable(&probe));

    h.arbiter.allocate_once().await;
    assert!(h.arbiter.allocatable(&probe));
}

/// Invariant: any sequence of pod events keeps `allocated` equal to the
/// running set and `request` equal to the pending set.
#[tokio::test]
async fn test_counter_invariants_under_event_churn() {
    let h = harness(test_config());
    h.consumers
        .apply(WatchEvent::Added(consumer_object("tenant-a")));

    let phases = [PodPhase::Pending, PodPhase::Running];
    let mut live: Vec<Pod> = Vec::new();
    // A small deterministic generator keeps the sequence reproducible.
    let mut seed: u64 = 0x5eed;
    for round in 0..200u64 {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(round);
        let action = seed % 3;
        match action {
            0 => {
                let pod = make_pod(
                    "tenant-a",
                    &format!("pod-{round}"),
                    phases[(seed >> 8) as usize % 2],
                    ((seed >> 16) % 4000) as f64,
                    ((seed >> 24) % 4000) as f64 * MIB,
                );
                h.pods.apply(WatchEvent::Added(pod.clone()));
                live.push(pod);
            }
            1 if !live.is_empty() => {
                let index = (seed >> 8) as usize % live.len();
                let mut updated = live[index].clone();
                updated.status.phase = phases[(seed >> 12) as usize % 2];
                updated.spec.containers[0].requests.cpu_millis = ((seed >> 16) % 4000) as f64;
                h.pods.apply(WatchEvent::Updated {
                    old: live[index].clone(),
                    new: updated.clone(),
                });
                live[index] = updated;
            }
            _ if !live.is_empty() => {
                let index = (seed >> 8) as usize % live.len();
                let pod = live.swap_remove(index);
                h.pods.apply(WatchEvent::Deleted(pod));
            }
            _ => {}
        }
    }

    let state = h.arbiter.state();
    let guard = state.lock();
    let consumer = &guard.consumers["tenant-a"];

    let mut running_sum = Resource::empty();
    for pod in consumer.running_pods.list() {
        running_sum.add(&pod.resource);
    }
    let mut pending_sum = Resource::empty();
    for pod in consumer.pending_pods.list() {
        pending_sum.add(&pod.resource);
    }

    assert!(consumer.allocated.approx_eq(&running_sum));
    assert!(consumer.request.approx_eq(&pending_sum));
}

/// Round trip: pod add then delete restores the consumer's counters.
#[tokio::test]
async fn test_pod_add_delete_round_trip() {
    let h = harness(test_config());
    h.consumers
        .apply(WatchEvent::Added(consumer_object("tenant-a")));

    let pod = make_pod("tenant-a", "p1", PodPhase::Pending, 700.0, 70.0 * MIB);
    h.pods.apply(WatchEvent::Added(pod.clone()));
    h.pods.apply(WatchEvent::Deleted(pod));

    let state = h.arbiter.state();
    let guard = state.lock();
    let consumer = &guard.consumers["tenant-a"];
    assert_eq!(consumer.request, Resource::empty());
    assert!(consumer.pending_pods.is_empty());
}

/// Round trip: a consumer update from the store keeps arbitrator-owned
/// fields intact.
#[tokio::test]
async fn test_consumer_update_preserves_arbitration() {
    let h = harness(test_config());
    h.consumers
        .apply(WatchEvent::Added(consumer_object("tenant-a")));
    h.pods.apply(WatchEvent::Added(make_pod(
        "tenant-a",
        "p1",
        PodPhase::Running,
        100.0,
        10.0 * MIB,
    )));
    h.arbiter.allocate_once().await;

    let mut refreshed = consumer_object("tenant-a");
    refreshed.metadata.resource_version = "99".to_string();
    h.consumers.apply(WatchEvent::Updated {
        old: consumer_object("tenant-a"),
        new: refreshed,
    });

    let state = h.arbiter.state();
    let guard = state.lock();
    let consumer = &guard.consumers["tenant-a"];
    assert_eq!(consumer.metadata.resource_version, "99");
    assert_eq!(consumer.allocated, Resource::new(100.0, 10.0 * MIB));
    assert!(consumer.deserved.is_some());
    assert_eq!(consumer.running_pods.len(), 1);
}

/// The spawned loops keep allocating in the background until cancelled.
#[tokio::test]
async fn test_background_loops_run_and_stop() {
    let mut config = test_config();
    config.allocate_period = Duration::from_millis(50);
    config.reclaim_period = Duration::from_millis(50);
    let h = harness(config);

    h.consumers
        .apply(WatchEvent::Added(consumer_object("tenant-a")));

    let stop_allocate = h.arbiter.spawn();
    let stop_reclaim = h.worker.spawn();

    assert!(
        fairshare_test_utils::wait::wait_for_condition(
            || h.consumer_api.num_updates() > 0,
            2000
        )
        .await,
        "allocation loop should publish"
    );

    stop_allocate.send(()).await.unwrap();
    stop_reclaim.send(()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let published = h.consumer_api.num_updates();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(
        h.consumer_api.num_updates(),
        published,
        "no further publishes after stop"
    );
}

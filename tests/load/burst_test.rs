//! Event storm against the demo network.
//!
//! Every transformer receives an interleaved storm of last gasps and sags
//! from all of its meters at once. Requirements:
//! - at most one active case per transformer at every point
//! - every event ends up processed
//! - ingestion stays well under a second per event

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

use ltgrid::config::Config;
use ltgrid::controller::AppState;
use ltgrid::dispatch::SimulatedGateway;
use ltgrid::domain::{EventPayload, NewEvent};
use ltgrid::simulation::demo_network;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn storm_keeps_one_active_case_per_transformer() {
    let network = demo_network().unwrap();
    let meters: Vec<_> = network
        .topology
        .transformers()
        .flat_map(|t| network.topology.meters_of(&t.id))
        .map(|m| m.id.clone())
        .collect();
    let st = AppState::with_gateway(
        Config::default(),
        network.topology,
        network.devices,
        Arc::new(SimulatedGateway::instant()),
    );

    let started = Instant::now();
    let mut set = JoinSet::new();
    for round in 0..5 {
        for meter in &meters {
            let payload = if round % 2 == 0 {
                EventPayload::LastGasp
            } else {
                EventPayload::VoltageSag { delta_voltage: -25.0, phase: None }
            };
            let controller = Arc::clone(&st.controller);
            let event = NewEvent::from_meter(meter.clone(), payload);
            set.spawn(async move {
                let t0 = Instant::now();
                controller.submit_event(event).await.map(|e| (e, t0.elapsed()))
            });
        }
    }

    let mut slowest = Duration::ZERO;
    let mut processed = 0;
    while let Some(result) = set.join_next().await {
        let (event, elapsed) = result.unwrap().unwrap();
        assert!(event.processed);
        slowest = slowest.max(elapsed);
        processed += 1;
    }
    assert_eq!(processed, meters.len() * 5);
    assert!(slowest < Duration::from_secs(1), "slowest ingestion took {slowest:?}");

    let mut per_transformer: HashMap<_, usize> = HashMap::new();
    for case in st.controller.list_active_cases() {
        *per_transformer.entry(case.transformer_ref).or_default() += 1;
    }
    assert!(per_transformer.values().all(|&n| n == 1));

    println!(
        "storm: {} events, {} active cases, {:?} total, slowest {:?}",
        processed,
        per_transformer.len(),
        started.elapsed(),
        slowest
    );
}

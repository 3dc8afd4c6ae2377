use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shopfloor_core::channel::{
    decode_reading, machine_namespace, vars, BrowseResponse, NamespacesResponse, ReadResponse,
    SERVER_NAMESPACE,
};
use shopfloor_core::{
    MachineReading, MachineState, MachineStatus, ManualClock, SimRng, Transition,
};
use shopfloor_simulator::{
    build, http, AddressSpace, ChannelError, MachineNode, Publisher, SimulationLoop,
    SimulatorConfig,
};

fn read_back(space: &AddressSpace, node: &MachineNode) -> MachineReading {
    let values: HashMap<_, _> = vars::ALL
        .iter()
        .map(|name| {
            let value = space
                .read(node.namespace_index(), node.object(), name)
                .unwrap();
            (name.to_string(), value)
        })
        .collect();
    decode_reading(node.object(), &values).unwrap()
}

#[test]
fn published_state_matches_machine_every_tick() {
    let space = AddressSpace::new();
    let machine = MachineState::new("cnc_1");
    let node = MachineNode::register(space.clone(), &machine.reading()).unwrap();
    let observer = node.clone();

    let clock = ManualClock::new();
    let mut root = SimRng::new(7);
    let mut sim = SimulationLoop::new(machine, clock.clone(), root.fork(), root.fork(), node);

    let mut last_total = 0;
    for _ in 0..5_000 {
        clock.advance(Duration::from_secs(1));
        sim.tick().unwrap();

        let published = read_back(&space, &observer);
        assert_eq!(published, sim.machine().reading());
        assert!(published.production_total >= last_total);
        last_total = published.production_total;
        assert_eq!(
            published.active_alarms.is_empty(),
            published.status != MachineStatus::Alarm
        );
        if published.status != MachineStatus::Running {
            assert_eq!(published.spindle_speed, 0.0);
        }
    }
    assert_eq!(sim.ticks(), 5_000);
}

#[test]
fn same_seed_same_run() {
    let run = |seed| {
        let clock = ManualClock::new();
        let mut root = SimRng::new(seed);
        let space = AddressSpace::new();
        let machine = MachineState::new("cnc_1");
        let node = MachineNode::register(space, &machine.reading()).unwrap();
        let mut sim = SimulationLoop::new(machine, clock.clone(), root.fork(), root.fork(), node);
        let mut transitions = Vec::new();
        for _ in 0..2_000 {
            clock.advance(Duration::from_secs(1));
            transitions.extend(sim.tick().unwrap());
        }
        (transitions, sim.machine().reading())
    };

    assert_eq!(run(11), run(11));
}

#[test]
fn object_reads_never_mix_two_publishes() {
    let mut machine = MachineState::new("cnc_1");
    let mut readings = vec![machine.reading()];
    for transition in [
        Transition::Start,
        Transition::Fault { code: "E101".into() },
        Transition::Repair,
    ] {
        machine.apply(&transition);
        readings.push(machine.reading());
    }

    let space = AddressSpace::new();
    let mut node = MachineNode::register(space.clone(), &readings[0]).unwrap();
    let (ns, object) = (node.namespace_index(), node.object().to_string());

    let stop = Arc::new(AtomicBool::new(false));
    let writer = {
        let stop = stop.clone();
        std::thread::spawn(move || {
            for reading in readings.iter().cycle() {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                node.publish(reading).unwrap();
            }
        })
    };

    for _ in 0..5_000 {
        let values: HashMap<_, _> = space.object_values(ns, &object).unwrap().into_iter().collect();
        let reading = decode_reading(&object, &values).unwrap();
        assert_eq!(
            reading.active_alarms.is_empty(),
            reading.status != MachineStatus::Alarm
        );
    }

    stop.store(true, Ordering::Relaxed);
    writer.join().unwrap();
}

struct Broken;

impl Publisher for Broken {
    fn publish(&mut self, _reading: &MachineReading) -> Result<(), ChannelError> {
        Err(ChannelError::Poisoned)
    }
}

#[test]
fn publish_failure_fails_the_tick() {
    let mut root = SimRng::new(1);
    let mut sim = SimulationLoop::new(
        MachineState::new("cnc_1"),
        ManualClock::new(),
        root.fork(),
        root.fork(),
        Broken,
    );
    assert!(matches!(sim.tick(), Err(ChannelError::Poisoned)));
    assert_eq!(sim.ticks(), 0);
}

#[tokio::test]
async fn publish_failure_stops_the_loop() {
    let mut root = SimRng::new(1);
    let sim = SimulationLoop::new(
        MachineState::new("cnc_1"),
        ManualClock::new(),
        root.fork(),
        root.fork(),
        Broken,
    );
    let res = tokio::time::timeout(Duration::from_secs(5), sim.run(Duration::from_millis(5)))
        .await
        .expect("loop should stop on its own");
    assert!(res.is_err());
}

#[tokio::test]
async fn channel_serves_machine_object_over_http() {
    let config = SimulatorConfig {
        seed: Some(3),
        ..SimulatorConfig::new("cnc_7", "127.0.0.1:0".parse().unwrap())
    };
    let (space, _sim) = build(&config).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, http::router(space)).await.unwrap();
    });
    let base = format!("http://{addr}");
    let client = reqwest::Client::new();

    let health = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert!(health.status().is_success());
    let body: serde_json::Value = health.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "ok": true }));

    let ns: NamespacesResponse = client
        .get(format!("{base}/v1/namespaces"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ns.namespaces[0], SERVER_NAMESPACE);
    let idx = ns.index_of(&machine_namespace("cnc_7")).unwrap();

    let browse: BrowseResponse = client
        .get(format!("{base}/v1/objects/{idx}/cnc_7"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(browse.variables.len(), vars::ALL.len());
    assert_eq!(browse.values.len(), vars::ALL.len());
    assert_eq!(
        decode_reading("cnc_7", &browse.values).unwrap(),
        MachineState::new("cnc_7").reading()
    );

    let status: ReadResponse = client
        .get(format!("{base}/v1/objects/{idx}/cnc_7/{}", vars::STATUS))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        status.value,
        shopfloor_core::channel::Variant::String("IDLE".into())
    );

    let missing = client
        .get(format!("{base}/v1/objects/{idx}/cnc_8"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

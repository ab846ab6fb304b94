use std::thread;
use std::time::Duration;

use antix_app::{Runner, StopFlag};
use antix_brain::ControllerKind;
use antix_core::{AntixConfig, ControllerRegistry, Tick, World};

fn world(config: AntixConfig) -> World {
    let mut registry = ControllerRegistry::new();
    let key = antix_brain::register(&mut registry, ControllerKind::Forager);
    World::populate(config, &registry, key).expect("world")
}

#[test]
fn bounded_run_stops_at_max_ticks() {
    let mut runner = Runner::new(world(AntixConfig {
        max_ticks: 250,
        sleep_ms: 0,
        report_interval: 50,
        rng_seed: Some(5),
        ..AntixConfig::default()
    }));
    let report = runner.run();
    assert_eq!(report.ticks, 250);
    assert_eq!(runner.world().tick(), Tick(250));
    assert_eq!(report.pickups, runner.world().totals().pickups);
    assert_eq!(report.delivered, runner.world().delivered_pucks());

    // a finished world does not advance further
    assert_eq!(runner.run().ticks, 0);
}

#[test]
fn raised_flag_prevents_any_tick() {
    let stop = StopFlag::new();
    stop.raise();
    let mut runner = Runner::new(world(AntixConfig {
        sleep_ms: 0,
        ..AntixConfig::default()
    }))
    .with_stop_flag(stop);
    assert_eq!(runner.run().ticks, 0);
    assert_eq!(runner.into_world().tick(), Tick::zero());
}

#[test]
fn unbounded_run_ends_when_stopped_from_another_thread() {
    let mut runner = Runner::new(world(AntixConfig {
        max_ticks: 0,
        sleep_ms: 1,
        home_population: 5,
        ..AntixConfig::default()
    }));
    let stop = runner.stop_flag();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        stop.raise();
    });
    let report = runner.run();
    stopper.join().expect("stopper thread");
    assert!(report.ticks > 0);
    assert!(report.elapsed > Duration::ZERO);
}

#[test]
fn report_serializes_to_json() {
    let mut runner = Runner::new(world(AntixConfig {
        max_ticks: 10,
        sleep_ms: 0,
        ..AntixConfig::default()
    }));
    let report = runner.run();
    let value = serde_json::to_value(report).expect("json");
    assert_eq!(value["ticks"], 10);
    assert!(value.get("delivered").is_some());
    assert!(value.get("elapsed").is_some());
}

//! End-to-end behaviour of the coordinator against recording fake backends.
//!
//! Mocks generated by mockall are only available inside the crate, so these
//! tests use small hand-written fakes that record every call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use sunlightr::geo::FixedElevation;
use sunlightr::scheduler::Scheduler;
use sunlightr::{
    ApplyOutcome, Coordinator, ElevationSource, FixtureBackend, FixtureCommand, Mode, PowerState,
    Settings,
};

/// Backend that records calls, can be slowed down, and tracks how many
/// commands were ever in flight at once.
#[derive(Default)]
struct RecordingBackend {
    states: HashMap<String, PowerState>,
    delay: Duration,
    power_delay: Duration,
    fail: AtomicBool,
    power_queries: AtomicUsize,
    commands: Mutex<Vec<FixtureCommand>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingBackend {
    fn with_states(states: &[(&str, PowerState)]) -> Self {
        Self {
            states: states
                .iter()
                .map(|(id, state)| (id.to_string(), *state))
                .collect(),
            ..Self::default()
        }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn slow_power_queries(mut self, delay: Duration) -> Self {
        self.power_delay = delay;
        self
    }

    fn commands(&self) -> Vec<FixtureCommand> {
        self.commands.lock().unwrap().clone()
    }
}

impl FixtureBackend for RecordingBackend {
    fn power_state(&self, fixture_id: &str) -> Result<PowerState> {
        self.power_queries.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.power_delay);
        match self.states.get(fixture_id) {
            Some(state) => Ok(*state),
            None => anyhow::bail!("unknown fixture {}", fixture_id),
        }
    }

    fn set_parameters(&self, command: &FixtureCommand) -> Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        thread::sleep(self.delay);
        self.commands.lock().unwrap().push(command.clone());

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("host refused the update");
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}

/// Elevation that tests can move between cycles.
#[derive(Clone, Default)]
struct MovableSun(Arc<Mutex<Option<f64>>>);

impl MovableSun {
    fn set(&self, elevation: Option<f64>) {
        *self.0.lock().unwrap() = elevation;
    }
}

impl ElevationSource for MovableSun {
    fn elevation(&self) -> Option<f64> {
        *self.0.lock().unwrap()
    }

    fn describe(&self) -> String {
        "movable test sun".to_string()
    }
}

fn settings(targets: &[&str], enabled: bool) -> Settings {
    Settings {
        targets: targets.iter().map(|t| t.to_string()).collect(),
        enabled,
        ..Settings::default()
    }
}

#[test]
fn test_empty_targets_never_call_backend() {
    let backend = Arc::new(RecordingBackend::default());
    let coordinator = Coordinator::new(
        &settings(&[], true),
        Box::new(FixedElevation(Some(20.0))),
        backend.clone(),
    );

    let snapshot = coordinator.apply_now().unwrap();
    assert_eq!(snapshot.apply_outcome, ApplyOutcome::SkippedNoTargets);
    assert_eq!(backend.power_queries.load(Ordering::SeqCst), 0);
    assert!(backend.commands().is_empty());
}

#[test]
fn test_all_off_or_unknown_never_sends_command() {
    let backend = Arc::new(RecordingBackend::with_states(&[
        ("light.a", PowerState::Off),
        ("light.b", PowerState::Unknown),
    ]));
    let coordinator = Coordinator::new(
        &settings(&["light.a", "light.b", "light.missing"], true),
        Box::new(FixedElevation(Some(20.0))),
        backend.clone(),
    );

    let snapshot = coordinator.apply_now().unwrap();
    assert_eq!(snapshot.apply_outcome, ApplyOutcome::SkippedAllOff);
    assert!(snapshot.adjusted_fixtures.is_empty());
    assert_eq!(backend.power_queries.load(Ordering::SeqCst), 3);
    assert!(backend.commands().is_empty());
}

#[test]
fn test_mixed_power_states_adjust_on_subset_in_order() {
    let backend = Arc::new(RecordingBackend::with_states(&[
        ("light.c", PowerState::On),
        ("light.a", PowerState::On),
        ("light.b", PowerState::Off),
    ]));
    let coordinator = Coordinator::new(
        &settings(&["light.c", "light.b", "light.a"], true),
        Box::new(FixedElevation(Some(19.5))),
        backend.clone(),
    );

    let snapshot = coordinator.apply_now().unwrap();
    assert_eq!(snapshot.apply_outcome, ApplyOutcome::Applied);
    assert_eq!(snapshot.adjusted_fixtures, vec!["light.c", "light.a"]);
    assert_eq!(snapshot.mode, Mode::Transition);

    let commands = backend.commands();
    assert_eq!(commands.len(), 1, "exactly one batched command");
    assert_eq!(commands[0].fixture_ids, vec!["light.c", "light.a"]);
    assert_eq!(commands[0].brightness_pct, 60);
    assert_eq!(commands[0].color_temp_kelvin, 4350);
}

#[test]
fn test_toggle_sequence() {
    let backend = Arc::new(RecordingBackend::with_states(&[("light.a", PowerState::On)]));
    let coordinator = Coordinator::new(
        &settings(&["light.a"], false),
        Box::new(FixedElevation(Some(45.0))),
        backend.clone(),
    );

    // false -> true applies synchronously
    let snapshot = coordinator.set_enabled(true).unwrap();
    assert_eq!(snapshot.apply_outcome, ApplyOutcome::Applied);
    assert_eq!(backend.commands().len(), 1);

    // true -> false publishes idle without touching fixtures
    let snapshot = coordinator.set_enabled(false).unwrap();
    assert_eq!(snapshot.apply_outcome, ApplyOutcome::Idle);
    assert_eq!(backend.commands().len(), 1);

    // Disabled ticks stay idle
    assert_eq!(coordinator.tick().unwrap().apply_outcome, ApplyOutcome::Idle);
    assert_eq!(backend.commands().len(), 1);
}

#[test]
fn test_fault_then_recovery() {
    let backend = Arc::new(RecordingBackend::with_states(&[("light.a", PowerState::On)]));
    backend.fail.store(true, Ordering::SeqCst);

    let coordinator = Coordinator::new(
        &settings(&["light.a"], true),
        Box::new(FixedElevation(Some(10.0))),
        backend.clone(),
    );

    let err = coordinator.apply_now().unwrap_err();
    assert!(format!("{:#}", err).contains("host refused the update"));
    let published = coordinator.current_snapshot();
    assert_eq!(published.apply_outcome, ApplyOutcome::Failed);
    assert!(published.adjusted_fixtures.is_empty());

    backend.fail.store(false, Ordering::SeqCst);
    let snapshot = coordinator.tick().unwrap();
    assert_eq!(snapshot.apply_outcome, ApplyOutcome::Applied);
    assert_eq!(snapshot.adjusted_fixtures, vec!["light.a"]);
}

#[test]
fn test_snapshot_follows_the_sun() {
    let sun = MovableSun::default();
    sun.set(Some(-20.0));
    let backend = Arc::new(RecordingBackend::with_states(&[("light.a", PowerState::On)]));
    let coordinator = Coordinator::new(
        &settings(&["light.a"], true),
        Box::new(sun.clone()),
        backend.clone(),
    );

    let night = coordinator.tick().unwrap();
    assert_eq!(night.mode, Mode::Night);
    assert_eq!(night.brightness_pct, 20);
    assert_eq!(night.color_temp_kelvin, 2200);

    sun.set(Some(60.0));
    let day = coordinator.tick().unwrap();
    assert_eq!(day.mode, Mode::Day);
    assert_eq!(day.brightness_pct, 100);
    assert_eq!(day.color_temp_kelvin, 6500);

    sun.set(None);
    let unavailable = coordinator.tick().unwrap();
    assert_eq!(unavailable.sun_elevation, 0.0);
    assert_eq!(unavailable.mode, Mode::Night);
}

#[test]
fn test_concurrent_cycles_never_overlap_commands() {
    let backend = Arc::new(
        RecordingBackend::with_states(&[("light.a", PowerState::On)])
            .delayed(Duration::from_millis(40)),
    );
    let coordinator = Arc::new(Coordinator::new(
        &settings(&["light.a"], true),
        Box::new(FixedElevation(Some(20.0))),
        backend.clone(),
    ));

    let workers: Vec<_> = (0..6)
        .map(|i| {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || {
                if i % 2 == 0 {
                    coordinator.apply_now()
                } else {
                    coordinator.tick()
                }
            })
        })
        .collect();

    for worker in workers {
        let snapshot = worker.join().unwrap().unwrap();
        assert_eq!(snapshot.apply_outcome, ApplyOutcome::Applied);
    }

    assert_eq!(backend.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(backend.commands().len(), 6, "queued requests all run");
}

#[test]
fn test_status_reads_do_not_wait_for_cycle() {
    let backend = Arc::new(
        RecordingBackend::with_states(&[("light.a", PowerState::On)])
            .delayed(Duration::from_millis(500)),
    );
    let coordinator = Arc::new(Coordinator::new(
        &settings(&["light.a"], true),
        Box::new(FixedElevation(Some(20.0))),
        backend.clone(),
    ));

    let worker = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || coordinator.apply_now())
    };

    // Let the cycle get into the slow command
    thread::sleep(Duration::from_millis(100));
    let started = Instant::now();
    let snapshot = coordinator.current_snapshot();
    assert!(coordinator.is_enabled());
    assert!(started.elapsed() < Duration::from_millis(250));
    assert_eq!(snapshot.apply_outcome, ApplyOutcome::Idle, "still the initial snapshot");

    worker.join().unwrap().unwrap();
    assert_eq!(coordinator.current_snapshot().apply_outcome, ApplyOutcome::Applied);
}

#[test]
fn test_queued_request_uses_latest_enabled_flag() {
    let backend = Arc::new(
        RecordingBackend::with_states(&[("light.a", PowerState::On)])
            .delayed(Duration::from_millis(300)),
    );
    let coordinator = Arc::new(Coordinator::new(
        &settings(&["light.a"], true),
        Box::new(FixedElevation(Some(20.0))),
        backend.clone(),
    ));

    let first = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || coordinator.apply_now())
    };
    thread::sleep(Duration::from_millis(100));

    // Queued behind the running cycle; runs disabled once it gets its turn
    let snapshot = coordinator.set_enabled(false).unwrap();
    assert_eq!(snapshot.apply_outcome, ApplyOutcome::Idle);

    assert_eq!(first.join().unwrap().unwrap().apply_outcome, ApplyOutcome::Applied);
    assert_eq!(backend.commands().len(), 1);
    assert_eq!(coordinator.current_snapshot().apply_outcome, ApplyOutcome::Idle);
}

#[test]
fn test_queued_enable_is_not_overtaken_by_later_disable() {
    let backend = Arc::new(
        RecordingBackend::with_states(&[("light.a", PowerState::On)])
            .slow_power_queries(Duration::from_millis(200)),
    );
    let coordinator = Arc::new(Coordinator::new(
        &settings(&["light.a"], true),
        Box::new(FixedElevation(Some(20.0))),
        backend.clone(),
    ));

    let running = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || coordinator.tick())
    };
    thread::sleep(Duration::from_millis(50));

    let enable = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || coordinator.set_enabled(true))
    };
    thread::sleep(Duration::from_millis(20));
    let disable = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || coordinator.set_enabled(false))
    };

    running.join().unwrap().unwrap();

    // Whichever order the two queued calls run in, each sees its own value
    let enabled = enable.join().unwrap().unwrap();
    assert_eq!(enabled.apply_outcome, ApplyOutcome::Applied);
    assert!(enabled.enabled_at_snapshot);
    assert_eq!(enabled.adjusted_fixtures, vec!["light.a"]);

    let disabled = disable.join().unwrap().unwrap();
    assert_eq!(disabled.apply_outcome, ApplyOutcome::Idle);
    assert!(!disabled.enabled_at_snapshot);

    assert_eq!(backend.commands().len(), 2);
}

#[test]
fn test_queued_toggles_each_flip_once() {
    let backend = Arc::new(
        RecordingBackend::with_states(&[("light.a", PowerState::On)])
            .slow_power_queries(Duration::from_millis(100)),
    );
    let coordinator = Arc::new(Coordinator::new(
        &settings(&["light.a"], true),
        Box::new(FixedElevation(Some(20.0))),
        backend.clone(),
    ));

    let running = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || coordinator.tick())
    };
    thread::sleep(Duration::from_millis(30));

    let toggles: Vec<_> = (0..3)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || coordinator.toggle())
        })
        .collect();

    running.join().unwrap().unwrap();
    let flags: Vec<bool> = toggles
        .into_iter()
        .map(|t| t.join().unwrap().unwrap().enabled_at_snapshot)
        .collect();

    // Three flips from enabled: two disabled snapshots and one enabled
    assert_eq!(flags.iter().filter(|&&f| !f).count(), 2);
    assert!(!coordinator.is_enabled());
}

#[test]
fn test_scheduler_ticks_until_shutdown() {
    let backend = Arc::new(RecordingBackend::with_states(&[("light.a", PowerState::On)]));
    let coordinator = Arc::new(Coordinator::new(
        &settings(&["light.a"], true),
        Box::new(FixedElevation(Some(20.0))),
        backend.clone(),
    ));
    let updates = coordinator.subscribe();
    let running = Arc::new(AtomicBool::new(true));

    let scheduler = Scheduler::spawn(
        Arc::clone(&coordinator),
        Duration::from_millis(50),
        Arc::clone(&running),
    )
    .unwrap();

    // Wait for a few scheduled cycles
    let first = updates.recv_timeout(Duration::from_secs(5)).unwrap();
    let second = updates.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(first.apply_outcome, ApplyOutcome::Applied);
    assert_eq!(second.apply_outcome, ApplyOutcome::Applied);

    running.store(false, Ordering::SeqCst);
    scheduler.join();

    let ticks = backend.commands().len();
    thread::sleep(Duration::from_millis(200));
    assert_eq!(backend.commands().len(), ticks, "no ticks after shutdown");
}

#[test]
fn test_scheduler_survives_faults() {
    let backend = Arc::new(RecordingBackend::with_states(&[("light.a", PowerState::On)]));
    backend.fail.store(true, Ordering::SeqCst);
    let coordinator = Arc::new(Coordinator::new(
        &settings(&["light.a"], true),
        Box::new(FixedElevation(Some(20.0))),
        backend.clone(),
    ));
    let updates = coordinator.subscribe();
    let running = Arc::new(AtomicBool::new(true));

    let scheduler = Scheduler::spawn(
        Arc::clone(&coordinator),
        Duration::from_millis(30),
        Arc::clone(&running),
    )
    .unwrap();

    let failed = updates.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(failed.apply_outcome, ApplyOutcome::Failed);

    backend.fail.store(false, Ordering::SeqCst);
    let recovered = loop {
        let snapshot = updates.recv_timeout(Duration::from_secs(5)).unwrap();
        if snapshot.apply_outcome != ApplyOutcome::Failed {
            break snapshot;
        }
    };
    assert_eq!(recovered.apply_outcome, ApplyOutcome::Applied);

    running.store(false, Ordering::SeqCst);
    scheduler.join();
}

//! End-to-end monitor runs over a scripted telemetry source.

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use grillmon_core::config::MonitorCfg;
use grillmon_core::observer::VecObserver;
use grillmon_core::{EtaEstimator, JsonLinesObserver, Monitor, Sampler, Status};
use grillmon_traits::{ManualClock, SystemClock, TelemetrySource};

type ReadResult = Result<Option<Vec<u8>>, Box<dyn std::error::Error + Send + Sync>>;

struct Script(VecDeque<ReadResult>);

impl TelemetrySource for Script {
    fn read(&mut self, _timeout: Duration) -> ReadResult {
        self.0.pop_front().unwrap_or(Ok(None))
    }
}

fn envelope(unix: i64, probe: i32, connected: bool) -> Vec<u8> {
    format!(
        r#"{{"status":{{"ambient":70,"connected":{connected},"grill":250,"set":250,"probe":{probe},"probe_con":1,"probe_set":200,"system_status":3,"time":{unix},"units":1}}}}"#
    )
    .into_bytes()
}

fn estimator() -> EtaEstimator {
    let start = chrono::DateTime::<chrono::Utc>::from_timestamp(1_751_720_000, 0).unwrap();
    EtaEstimator::builder()
        .with_clock(ManualClock::new(start))
        .try_build()
        .unwrap()
}

#[test]
fn processes_stream_until_end() {
    let base = 1_751_720_000;
    let script: VecDeque<ReadResult> = vec![
        Ok(Some(envelope(base, 100, true))),
        Ok(Some(envelope(base + 600, 130, true))),
        Ok(Some(envelope(base + 900, 135, false))),
        Ok(Some(b"garbage".to_vec())),
        Err("link dropped".into()),
        Ok(Some(envelope(base + 1200, 150, true))),
    ]
    .into();
    let sampler = Sampler::spawn(Script(script), 4, Duration::from_millis(10), SystemClock::new());
    let mut monitor = Monitor::new(estimator(), VecObserver::default(), MonitorCfg::default());
    let stop = AtomicBool::new(false);

    let report = monitor.run(&sampler, &stop).unwrap();
    assert_eq!(report.received, 5);
    assert_eq!(report.decode_errors, 1);
    assert_eq!(report.source_errors, 1);
    assert_eq!(report.disconnected, 1);
    assert_eq!(report.estimated, 3);

    let seen = monitor.into_observer().statuses;
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|s| s.connected && s.probe_eta.is_some()));
}

#[test]
fn seeding_primes_the_estimator() {
    let history: Vec<Status> = [(0, 100), (600, 130), (1200, 150)]
        .into_iter()
        .map(|(dt, p)| Status::from_update_payload(&envelope(1_751_720_000 + dt, p, true)).unwrap())
        .collect();
    let mut monitor = Monitor::new(estimator(), VecObserver::default(), MonitorCfg::default());
    assert_eq!(monitor.seed(&history), 3);
    assert!(monitor.estimator().is_initialized());
    assert!(monitor.estimator().model().time_constant() < 3600.0);
    assert_eq!(monitor.report().seeded, 3);
}

struct Silent;

impl TelemetrySource for Silent {
    fn read(&mut self, timeout: Duration) -> ReadResult {
        std::thread::sleep(timeout);
        Err("timeout".into())
    }
}

#[test]
fn stop_flag_ends_run_and_stall_is_reported() {
    let sampler = Sampler::spawn(Silent, 1, Duration::from_millis(5), SystemClock::new());
    let cfg = MonitorCfg {
        stall_timeout: Duration::from_millis(50),
        ..MonitorCfg::default()
    };
    let mut monitor = Monitor::new(estimator(), JsonLinesObserver::new(Vec::new()), cfg);
    let stop = AtomicBool::new(false);

    std::thread::scope(|s| {
        s.spawn(|| {
            std::thread::sleep(Duration::from_millis(400));
            stop.store(true, std::sync::atomic::Ordering::Relaxed);
        });
        let report = monitor.run(&sampler, &stop).unwrap();
        assert!(report.stalls >= 1);
        assert_eq!(report.received, 0);
    });
    assert!(monitor.into_observer().into_inner().is_empty());
}

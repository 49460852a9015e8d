//! Background telemetry reader.
//!
//! Spawns a thread that owns the `TelemetrySource` and forwards every raw
//! payload through a bounded channel. Unlike a latest-value sampler, nothing is
//! dropped: when the consumer falls behind the reader blocks.
//!
//! Each `Sampler` spawns exactly one thread; dropping the `Sampler` signals it
//! and joins it (or detaches it if it stays blocked inside `read`).
use crossbeam_channel as xch;
use grillmon_traits::TelemetrySource;
use grillmon_traits::clock::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

/// Granularity at which a blocked send re-checks the shutdown flag.
const SEND_POLL: Duration = Duration::from_millis(100);
/// Pause after a source error before reading again.
const ERROR_BACKOFF: Duration = Duration::from_millis(100);
/// How long `Drop` waits for a thread stuck in `read` before detaching it.
const JOIN_GRACE: Duration = Duration::from_millis(500);

/// One item forwarded from the reader thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplerEvent {
    Payload(Vec<u8>),
    /// The source reported a (possibly transient) failure; reading continues.
    Error(String),
    /// The source is exhausted; no further events follow.
    End,
}

pub struct Sampler {
    rx: xch::Receiver<SamplerEvent>,
    /// Unix millis of the last payload, 0 until one arrives.
    last_ok: Arc<AtomicI64>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl core::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sampler")
            .field("queued", &self.rx.len())
            .field("last_ok_ms", &self.last_ok.load(Ordering::Relaxed))
            .finish()
    }
}

impl Sampler {
    /// Start reading `source` on a new thread. `read_timeout` is passed to every
    /// `read` call; `capacity` bounds the channel (clamped to at least 1).
    pub fn spawn<S, C>(mut source: S, capacity: usize, read_timeout: Duration, clock: C) -> Self
    where
        S: TelemetrySource + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let (tx, rx) = xch::bounded(capacity.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let last_ok = Arc::new(AtomicI64::new(0));
        let last_ok_clone = last_ok.clone();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("sampler thread received shutdown signal");
                    break;
                }

                let event = match source.read(read_timeout) {
                    Ok(Some(payload)) => {
                        last_ok_clone.store(clock.now().timestamp_millis(), Ordering::Relaxed);
                        SamplerEvent::Payload(payload)
                    }
                    Ok(None) => {
                        let _ = forward(&tx, SamplerEvent::End, &shutdown_clone);
                        tracing::debug!("telemetry source exhausted");
                        break;
                    }
                    Err(e) => {
                        clock.sleep(ERROR_BACKOFF);
                        SamplerEvent::Error(e.to_string())
                    }
                };
                if !forward(&tx, event, &shutdown_clone) {
                    tracing::debug!("sampler consumer gone, exiting thread");
                    break;
                }
            }
            tracing::trace!("sampler thread exiting cleanly");
        });

        Self {
            rx,
            last_ok,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<SamplerEvent, xch::RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Unix millis of the last payload read, if any.
    pub fn last_ok_ms(&self) -> Option<i64> {
        match self.last_ok.load(Ordering::Relaxed) {
            0 => None,
            ms => Some(ms),
        }
    }

    /// Ask the thread to stop after its current read.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

/// Blocking send that gives up when shutdown is requested or the receiver is gone.
/// Returns `false` when the thread should exit.
fn forward(tx: &xch::Sender<SamplerEvent>, mut event: SamplerEvent, shutdown: &AtomicBool) -> bool {
    loop {
        match tx.send_timeout(event, SEND_POLL) {
            Ok(()) => return true,
            Err(xch::SendTimeoutError::Timeout(back)) => {
                if shutdown.load(Ordering::Relaxed) {
                    return false;
                }
                event = back;
            }
            Err(xch::SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(handle) = self.join_handle.take() {
            // A reader parked on stdin cannot observe the flag until a line arrives.
            let deadline = std::time::Instant::now() + JOIN_GRACE;
            while !handle.is_finished() && std::time::Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(10));
            }
            if !handle.is_finished() {
                tracing::debug!("sampler thread still blocked in read; detaching");
                return;
            }
            match handle.join() {
                Ok(()) => tracing::trace!("sampler thread joined"),
                Err(e) => tracing::warn!(?e, "sampler thread panicked during shutdown"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grillmon_traits::{ManualClock, SystemClock};
    use std::collections::VecDeque;

    type ReadResult = Result<Option<Vec<u8>>, Box<dyn std::error::Error + Send + Sync>>;

    struct Scripted(VecDeque<ReadResult>);

    impl TelemetrySource for Scripted {
        fn read(&mut self, _timeout: Duration) -> ReadResult {
            self.0.pop_front().unwrap_or(Ok(None))
        }
    }

    #[test]
    fn forwards_payloads_errors_and_end_in_order() {
        let script: VecDeque<ReadResult> = vec![
            Ok(Some(b"a".to_vec())),
            Err("boom".into()),
            Ok(Some(b"b".to_vec())),
        ]
        .into();
        let s = Sampler::spawn(Scripted(script), 1, Duration::from_millis(10), ManualClock::default());
        let wait = Duration::from_secs(5);
        assert_eq!(s.recv_timeout(wait).unwrap(), SamplerEvent::Payload(b"a".to_vec()));
        assert_eq!(s.recv_timeout(wait).unwrap(), SamplerEvent::Error("boom".into()));
        assert_eq!(s.recv_timeout(wait).unwrap(), SamplerEvent::Payload(b"b".to_vec()));
        assert_eq!(s.recv_timeout(wait).unwrap(), SamplerEvent::End);
    }

    struct Endless;

    impl TelemetrySource for Endless {
        fn read(&mut self, timeout: Duration) -> ReadResult {
            std::thread::sleep(timeout);
            Ok(Some(b"{}".to_vec()))
        }
    }

    #[test]
    fn drop_stops_thread_with_full_channel() {
        let s = Sampler::spawn(Endless, 1, Duration::from_millis(1), SystemClock::new());
        assert!(matches!(
            s.recv_timeout(Duration::from_secs(5)),
            Ok(SamplerEvent::Payload(_))
        ));
        assert!(s.last_ok_ms().is_some());
        // Channel refills and the thread parks in send; drop must still return.
        std::thread::sleep(Duration::from_millis(20));
        drop(s);
    }
}

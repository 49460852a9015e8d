pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

/// A stream of raw telemetry payloads (one JSON document per item).
///
/// `Ok(None)` means the stream has ended and no further payloads will arrive.
/// Implementations may block up to `timeout` waiting for the next payload.
pub trait TelemetrySource {
    fn read(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Option<Vec<u8>>, Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: TelemetrySource + ?Sized> TelemetrySource for Box<T> {
    fn read(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Option<Vec<u8>>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read(timeout)
    }
}

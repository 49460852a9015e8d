//! Sinks for processed statuses.

use std::io::Write;

use crate::error::Result;
use crate::telemetry::Status;
use eyre::WrapErr;

/// Receives every connected status after the monitor has attached its ETA.
pub trait StatusObserver {
    fn observe(&mut self, status: &Status) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: StatusObserver + ?Sized> StatusObserver for Box<T> {
    fn observe(&mut self, status: &Status) -> Result<()> {
        (**self).observe(status)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl StatusObserver for NullObserver {
    fn observe(&mut self, _status: &Status) -> Result<()> {
        Ok(())
    }
}

/// Writes one JSON object per line; the output can be fed back as `--history`.
#[derive(Debug)]
pub struct JsonLinesObserver<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesObserver<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> StatusObserver for JsonLinesObserver<W> {
    fn observe(&mut self, status: &Status) -> Result<()> {
        serde_json::to_writer(&mut self.out, status).wrap_err("encode status")?;
        self.out.write_all(b"\n").wrap_err("write status")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush().wrap_err("flush status output")
    }
}

/// Collects statuses in memory.
#[derive(Debug, Default, Clone)]
pub struct VecObserver {
    pub statuses: Vec<Status>,
}

impl StatusObserver for VecObserver {
    fn observe(&mut self, status: &Status) -> Result<()> {
        self.statuses.push(status.clone());
        Ok(())
    }
}

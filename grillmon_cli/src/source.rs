//! Line-oriented telemetry sources.

use std::io::BufRead;
use std::time::Duration;

use grillmon_traits::TelemetrySource;

/// Yields one payload per non-blank line of `reader`.
///
/// Reads block; the timeout hint is not honoured.
#[derive(Debug)]
pub struct JsonLinesSource<R> {
    reader: R,
    line: String,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }
}

impl<R: BufRead> TelemetrySource for JsonLinesSource<R> {
    fn read(
        &mut self,
        _timeout: Duration,
    ) -> Result<Option<Vec<u8>>, Box<dyn std::error::Error + Send + Sync>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            let trimmed = self.line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.as_bytes().to_vec()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blank_lines_and_ends() {
        let mut src = JsonLinesSource::new("a\n\n  \nb\r\n".as_bytes());
        let t = Duration::from_millis(1);
        assert_eq!(src.read(t).unwrap(), Some(b"a".to_vec()));
        assert_eq!(src.read(t).unwrap(), Some(b"b".to_vec()));
        assert_eq!(src.read(t).unwrap(), None);
    }
}

/// Tracing output to the browser console
use std::io::{self, Write};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Line-buffered writer that forwards each complete line to `console.log`
#[derive(Default)]
pub struct ConsoleWriter {
    buffer: Vec<u8>,
}

impl ConsoleWriter {
    fn emit(line: &str) {
        web_sys::console::log_1(&line.into());
    }
}

/// Remove every complete line from `buffer`, passing each to `emit`
fn drain_lines(buffer: &mut Vec<u8>, mut emit: impl FnMut(&str)) {
    while let Some(end) = buffer.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=end).collect();
        emit(String::from_utf8_lossy(&line[..end]).trim_end_matches('\r'));
    }
}

impl Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        drain_lines(&mut self.buffer, Self::emit);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            Self::emit(&String::from_utf8_lossy(&self.buffer));
            self.buffer.clear();
        }
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Install the console subscriber. Returns false if one was already set,
/// which happens when a page creates more than one viewer.
pub fn init(level: &str) -> bool {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    // No wall clock on wasm32-unknown-unknown
    let console_layer = fmt::layer()
        .with_writer(ConsoleWriter::default)
        .with_ansi(false)
        .without_time();

    Registry::default().with(filter).with(console_layer).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_lines_keeps_partial_tail() {
        let mut buffer = b"first\nsecond\r\nthi".to_vec();
        let mut lines = Vec::new();
        drain_lines(&mut buffer, |l| lines.push(l.to_string()));
        assert_eq!(lines, vec!["first", "second"]);
        assert_eq!(buffer, b"thi");
    }
}

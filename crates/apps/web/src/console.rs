//! `tracing` output routed to the browser console.
//!
//! Each formatted event is buffered and written with the console method
//! matching its level when the writer drops. Off wasm32 the lines go to
//! stderr, so native tests can still log.

use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::ViewerError;

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleMakeWriter;

pub struct ConsoleWriter {
    level: Level,
    buf: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.buf);
        emit(self.level, line.trim_end());
    }
}

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            level: Level::INFO,
            buf: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter {
            level: *meta.level(),
            buf: Vec::new(),
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn emit(level: Level, line: &str) {
    let msg = wasm_bindgen::JsValue::from_str(line);
    match level {
        Level::ERROR => web_sys::console::error_1(&msg),
        Level::WARN => web_sys::console::warn_1(&msg),
        Level::INFO => web_sys::console::info_1(&msg),
        _ => web_sys::console::debug_1(&msg),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn emit(_level: Level, line: &str) {
    eprintln!("{line}");
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init_logging(filter: &str) -> Result<(), ViewerError> {
    let filter = EnvFilter::try_new(filter)
        .map_err(|e| ViewerError::Config(format!("invalid log filter {filter:?}: {e}")))?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_ansi(false)
        .with_target(true)
        .with_writer(ConsoleMakeWriter)
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ConsoleMakeWriter, init_logging};
    use std::io::Write;
    use tracing::Level;
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn writer_buffers_until_drop() {
        let make = ConsoleMakeWriter;
        let mut w = make.make_writer();
        w.write_all(b"hello ").expect("write");
        w.write_all(b"world\n").expect("write");
        assert_eq!(w.buf, b"hello world\n");
        assert_eq!(w.level, Level::INFO);
    }

    #[test]
    fn bad_filters_are_config_errors() {
        assert!(init_logging("museum_globe_web=loud").is_err());
    }

    #[test]
    fn logging_can_be_installed_twice() {
        assert!(init_logging("debug").is_ok());
        assert!(init_logging("warn").is_ok());
    }
}

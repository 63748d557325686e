#![forbid(unsafe_code)]

//! `tracing` output routed to the browser console.
//!
//! [`install`] sets up a `tracing-subscriber` fmt subscriber whose writer
//! forwards each formatted event to the console method matching its level,
//! plus a panic hook that reports through the same sink. Both are installed
//! once per module instance.

use std::io;
use std::sync::Once;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;

/// Console method an event is written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl From<&Level> for ConsoleLevel {
    fn from(level: &Level) -> Self {
        match *level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO => Self::Info,
            Level::DEBUG | Level::TRACE => Self::Debug,
        }
    }
}

/// Destination for one formatted line.
pub type Sink = fn(ConsoleLevel, &str);

#[cfg(target_arch = "wasm32")]
fn console_sink(level: ConsoleLevel, line: &str) {
    use wasm_bindgen::JsValue;
    use web_sys::console;

    let msg = JsValue::from_str(line);
    match level {
        ConsoleLevel::Error => console::error_1(&msg),
        ConsoleLevel::Warn => console::warn_1(&msg),
        ConsoleLevel::Info => console::info_1(&msg),
        ConsoleLevel::Debug => console::debug_1(&msg),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn console_sink(_level: ConsoleLevel, line: &str) {
    eprintln!("{line}");
}

/// Buffers one event and emits it on flush or drop.
pub struct ConsoleWriter {
    level: ConsoleLevel,
    sink: Sink,
    buf: Vec<u8>,
}

impl ConsoleWriter {
    fn emit(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.buf);
        let line = text.trim_end_matches(['\n', '\r']);
        if !line.is_empty() {
            (self.sink)(self.level, line);
        }
        self.buf.clear();
    }
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit();
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        self.emit();
    }
}

/// [`MakeWriter`] producing level-aware [`ConsoleWriter`]s.
#[derive(Debug, Clone, Copy)]
pub struct MakeConsoleWriter {
    sink: Sink,
}

impl Default for MakeConsoleWriter {
    fn default() -> Self {
        Self {
            sink: console_sink,
        }
    }
}

impl MakeConsoleWriter {
    /// Writer that sends lines to `sink` instead of the console.
    #[must_use]
    pub const fn with_sink(sink: Sink) -> Self {
        Self { sink }
    }
}

impl<'a> MakeWriter<'a> for MakeConsoleWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            level: ConsoleLevel::Info,
            sink: self.sink,
            buf: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter {
            level: meta.level().into(),
            sink: self.sink,
            buf: Vec::new(),
        }
    }
}

fn panic_message(info: &std::panic::PanicHookInfo<'_>) -> String {
    match info.location() {
        Some(loc) => format!(
            "panic at {}:{}:{}: {info}",
            loc.file(),
            loc.line(),
            loc.column()
        ),
        None => format!("panic: {info}"),
    }
}

/// Install the console subscriber and panic hook. Idempotent.
///
/// The subscriber is shared by every element on the page, so it passes
/// `DEBUG`; renderers only emit debug events when their own `debug` option
/// is set.
///
/// An already-installed global subscriber (e.g. from the embedding page's
/// own module) is left in place.
pub fn install() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            console_sink(ConsoleLevel::Error, &panic_message(info));
        }));
        let _ = tracing_subscriber::fmt()
            .with_writer(MakeConsoleWriter::default())
            .with_max_level(Level::DEBUG)
            .with_target(false)
            .without_time()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Write;

    thread_local! {
        static LINES: RefCell<Vec<(ConsoleLevel, String)>> = const { RefCell::new(Vec::new()) };
    }

    fn capture(level: ConsoleLevel, line: &str) {
        LINES.with(|l| l.borrow_mut().push((level, line.to_owned())));
    }

    fn take_lines() -> Vec<(ConsoleLevel, String)> {
        LINES.with(|l| std::mem::take(&mut *l.borrow_mut()))
    }

    #[test]
    fn levels_map_to_console_methods() {
        assert_eq!(ConsoleLevel::from(&Level::ERROR), ConsoleLevel::Error);
        assert_eq!(ConsoleLevel::from(&Level::WARN), ConsoleLevel::Warn);
        assert_eq!(ConsoleLevel::from(&Level::INFO), ConsoleLevel::Info);
        assert_eq!(ConsoleLevel::from(&Level::TRACE), ConsoleLevel::Debug);
    }

    #[test]
    fn writer_emits_one_trimmed_line_on_drop() {
        let make = MakeConsoleWriter::with_sink(capture);
        {
            let mut w = make.make_writer();
            w.write_all(b"hello ").unwrap();
            w.write_all(b"world\n").unwrap();
        }
        assert_eq!(take_lines(), vec![(ConsoleLevel::Info, "hello world".to_owned())]);
    }

    #[test]
    fn flush_emits_and_resets() {
        let make = MakeConsoleWriter::with_sink(capture);
        let mut w = make.make_writer();
        w.write_all(b"first\n").unwrap();
        w.flush().unwrap();
        drop(w);
        assert_eq!(take_lines().len(), 1);
    }

    #[test]
    fn subscriber_routes_by_level() {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(MakeConsoleWriter::with_sink(capture))
            .with_max_level(Level::DEBUG)
            .with_target(false)
            .without_time()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("Failed to load image from \"x.png\"");
            tracing::debug!("Invalid width \"abc\", using 400");
        });
        let lines = take_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0, ConsoleLevel::Error);
        assert!(lines[0].1.contains("Failed to load image from \"x.png\""));
        assert_eq!(lines[1].0, ConsoleLevel::Debug);
    }
}

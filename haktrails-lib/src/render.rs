//! Result and error rendering.
//!
//! Workers share one [`Output`]. Every record (a result's full listing, a
//! JSON document, or an error line) is formatted up front and written with a
//! single locked `write_all`, so records from different workers never
//! interleave. Order between records is not guaranteed above one worker.

use crate::error::TrailsError;
use crate::types::{OutputMode, RemoteResult};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Format a successful result as it should appear on stdout.
///
/// List mode yields the flattened lines, newline-terminated; an empty
/// listing yields an empty string. JSON mode yields the raw payload as one
/// compact document followed by a newline.
pub fn format_result(result: &RemoteResult, mode: OutputMode) -> String {
    match mode {
        OutputMode::List => {
            let mut text = String::new();
            for line in &result.lines {
                text.push_str(line);
                text.push('\n');
            }
            text
        }
        OutputMode::Json => format!("{}\n", result.raw),
    }
}

/// Format a per-item error as it should appear on stderr.
pub fn format_error(err: &TrailsError) -> String {
    format!("error: {}\n", err)
}

type Sink = Mutex<Box<dyn Write + Send>>;

/// Serialized writer for results (stdout) and errors (stderr).
pub struct Output {
    mode: OutputMode,
    out: Sink,
    err: Sink,
}

impl Output {
    /// Write results to stdout and errors to stderr.
    pub fn stdio(mode: OutputMode) -> Self {
        Self::new(mode, Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Write to arbitrary sinks.
    pub fn new(mode: OutputMode, out: Box<dyn Write + Send>, err: Box<dyn Write + Send>) -> Self {
        Self {
            mode,
            out: Mutex::new(out),
            err: Mutex::new(err),
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Emit one successful result as a single record.
    pub fn render(&self, result: &RemoteResult) {
        let text = format_result(result, self.mode);
        if text.is_empty() {
            return;
        }
        write_record(&self.out, &text);
    }

    /// Emit one per-item error line.
    pub fn render_error(&self, err: &TrailsError) {
        write_record(&self.err, &format_error(err));
    }
}

fn write_record(sink: &Sink, text: &str) {
    // A poisoned lock only means another worker panicked mid-write; the
    // sink itself is still usable.
    let mut writer = match sink.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let written = writer
        .write_all(text.as_bytes())
        .and_then(|_| writer.flush());
    match written {
        Ok(()) => {}
        // Downstream closed (e.g. `| head`); nothing left to do.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
        Err(e) => tracing::warn!("failed to write output: {}", e),
    }
}

/// In-memory sink, cloneable so a test can keep a handle while the
/// [`Output`] owns the other.
#[derive(Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        let buffer = match self.buffer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut buffer = match self.buffer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(lines: &[&str]) -> RemoteResult {
        RemoteResult::new(
            &["a.com".to_string()],
            lines.iter().map(|s| s.to_string()).collect(),
            json!({"subdomains": ["www", "mail"]}),
        )
    }

    fn memory_output(mode: OutputMode) -> (Output, MemorySink, MemorySink) {
        let out = MemorySink::new();
        let err = MemorySink::new();
        let output = Output::new(mode, Box::new(out.clone()), Box::new(err.clone()));
        (output, out, err)
    }

    #[test]
    fn test_list_mode_one_line_per_value() {
        let text = format_result(&result(&["www.a.com", "mail.a.com"]), OutputMode::List);
        assert_eq!(text, "www.a.com\nmail.a.com\n");
    }

    #[test]
    fn test_list_mode_empty_listing_writes_nothing() {
        let (output, out, _) = memory_output(OutputMode::List);
        output.render(&result(&[]));
        assert_eq!(out.contents(), "");
    }

    #[test]
    fn test_json_mode_writes_raw_payload() {
        let (output, out, _) = memory_output(OutputMode::Json);
        output.render(&result(&[]));
        assert_eq!(out.contents(), "{\"subdomains\":[\"www\",\"mail\"]}\n");
    }

    #[test]
    fn test_errors_go_to_error_sink() {
        let (output, out, err) = memory_output(OutputMode::List);
        output.render_error(&TrailsError::from_status("bad.com", 401, ""));
        assert_eq!(out.contents(), "");
        assert_eq!(
            err.contents(),
            "error: Authentication rejected for 'bad.com' (HTTP 401)\n"
        );
    }

    #[test]
    fn test_concurrent_records_do_not_interleave() {
        let (output, out, _) = memory_output(OutputMode::List);
        let output = Arc::new(output);

        let threads: Vec<_> = (0..8)
            .map(|t| {
                let output = output.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let lines = vec![format!("{}-{}-first", t, i), format!("{}-{}-second", t, i)];
                        output.render(&RemoteResult::new(&[], lines, json!(null)));
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let contents = out.contents();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 8 * 50 * 2);
        for pair in lines.chunks(2) {
            let first = pair[0].strip_suffix("-first").unwrap();
            let second = pair[1].strip_suffix("-second").unwrap();
            assert_eq!(first, second);
        }
    }
}

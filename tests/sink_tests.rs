//! Behavioral tests for the local sink backends.

use std::{
    io::{self, Write},
    sync::Arc,
};

use parking_lot::Mutex;
use rstest::rstest;
use serde_json::json;

use fluent_forward::{ConsoleSink, EventTime, MemoryDiagnostics, NullSink, Record, Sink, TestSink};

/// Writer handing its bytes to a shared buffer the test can inspect.
#[derive(Clone, Default)]
struct SharedBuf {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.bytes.lock().clone()).expect("utf-8 output")
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writer that refuses every byte.
struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
    }
}

fn record(entries: &[(&str, serde_json::Value)]) -> Record {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

#[rstest]
fn console_lines_carry_time_tag_and_fields() {
    let buf = SharedBuf::default();
    let sink = ConsoleSink::new(buf.clone()).with_time_format("%s");
    let delivered = sink
        .post_with_time(
            "myapp.access",
            &record(&[("agent", json!("foo")), ("status", json!(200))]),
            EventTime::from(1_700_000_000u64),
        )
        .expect("post succeeds");
    assert!(delivered);
    assert_eq!(
        buf.contents(),
        "1700000000 myapp.access: agent=\"foo\" status=200\n"
    );
}

#[rstest]
fn console_renders_nested_values_as_json() {
    let buf = SharedBuf::default();
    let sink = ConsoleSink::new(buf.clone()).with_time_format("%s");
    sink.post_with_time(
        "t",
        &record(&[("ctx", json!({"user": "u", "id": 7}))]),
        EventTime::from(1u64),
    )
    .expect("post succeeds");
    assert_eq!(buf.contents(), "1 t: ctx={\"user\":\"u\",\"id\":7}\n");
}

#[rstest]
fn console_write_failure_is_soft_and_diagnosed() {
    let diagnostics = MemoryDiagnostics::new();
    let sink = ConsoleSink::new(BrokenPipe).with_diagnostics(Arc::new(diagnostics.clone()));
    let delivered = sink
        .post("t", &record(&[("a", json!("b"))]))
        .expect("write failure is not a caller error");
    assert!(!delivered);
    assert!(diagnostics.contains("console sink write failed"));
    // Close flushes best-effort and must not panic on a broken writer.
    sink.close();
    assert!(diagnostics.contains("console sink flush failed"));
}

#[rstest]
fn null_sink_swallows_everything() {
    let sink = NullSink;
    let delivered = sink
        .post("t", &record(&[("a", json!("b"))]))
        .expect("post succeeds");
    assert!(delivered);
    assert!(sink.is_connected());
    sink.close();
}

#[rstest]
fn backends_share_the_facade() {
    let capture = Arc::new(TestSink::new());
    let sinks: Vec<Arc<dyn Sink>> = vec![
        Arc::new(NullSink),
        Arc::new(ConsoleSink::new(SharedBuf::default())),
        Arc::clone(&capture) as Arc<dyn Sink>,
    ];
    for sink in &sinks {
        let delivered = sink
            .post("t", &record(&[("a", json!("b"))]))
            .expect("post succeeds");
        assert!(delivered);
    }
    assert_eq!(capture.len(), 1);
    for sink in &sinks {
        sink.close();
    }
}

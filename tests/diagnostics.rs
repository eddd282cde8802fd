use spark_groups::{GroupingConfig, Keyed, OrderedCollection};
use std::io::Write;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
struct Note {
    id: u32,
    topic: &'static str,
}

impl Keyed for Note {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}

/// Collects formatted log output.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut bytes) = self.0.lock() {
            bytes.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_missing_close_signal_logs_warning() {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer({
            let captured = captured.clone();
            move || captured.clone()
        })
        .with_ansi(false)
        .finish();

    let notes = OrderedCollection::from_records([Note { id: 1, topic: "rust" }]);

    let grouped = tracing::subscriber::with_default(subscriber, || {
        GroupingConfig::new()
            .collection(&notes)
            .group_by(|n: &Note| n.topic)
            .build()
    })
    .unwrap();

    assert_eq!(grouped.keys(), vec!["rust"]);
    let log = captured.text();
    assert!(log.contains("WARN"), "no warning in {log:?}");
    assert!(log.contains("close signal"), "unexpected warning {log:?}");
}

#[test]
fn test_grouping_runs_under_fmt_subscriber() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let notes = OrderedCollection::from_records([
        Note { id: 1, topic: "rust" },
        Note { id: 2, topic: "go" },
    ]);
    let grouped = GroupingConfig::new()
        .collection(&notes)
        .group_by(|n: &Note| n.topic)
        .on_diagnostic(|_| {})
        .build()
        .unwrap();

    notes.remove(&2);
    notes.update(&1, |n| n.topic = "zig");
    grouped.close();

    assert_eq!(grouped.keys(), vec!["zig"]);
}

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use gamalog_core::mocks::{BrokenImage, ScriptedImage, ScriptedRead};
use gamalog_core::{
    CsvTableSink, CycleOutcome, Delivery, MachineIdentity, MemorySink, RunStatus, Tailer,
    TailerSettings,
};
use gamalog_image::MemoryImage;
use gamalog_traits::{Clock, ManualClock};
use rstest::rstest;

const HEADER: &str = "GAMA LOG TYPE: G50-H;VERSION: 2.1;METRIC: C";

fn rec(minute: u32, counter: i64) -> String {
    format!(
        "15-01-2024 08:{minute:02}:00;{minute};45.2;46.0;44.8;46.0;47.1;48.0;0;0;12.5;11.9;1450;1390;{counter};0"
    )
}

fn log(counters: &[i64]) -> String {
    let mut s = format!("{HEADER}\n");
    for (i, c) in counters.iter().enumerate() {
        s.push_str(&rec(i as u32, *c));
        s.push('\n');
    }
    s
}

fn settings() -> TailerSettings {
    TailerSettings {
        identity: MachineIdentity {
            name: "CDL Line 1".into(),
            location_name: "Coteau-du-Lac".into(),
            location: "POINT(-74.1771 45.3053)".into(),
        },
        timezone: chrono_tz::America::Toronto,
        ..TailerSettings::default()
    }
}

fn clock() -> ManualClock {
    ManualClock::starting_at(SystemTime::UNIX_EPOCH + Duration::from_secs(1_705_325_400))
}

#[rstest]
#[case(&[500, 510, 500], RunStatus::Stopped)]
#[case(&[500, 510, 0], RunStatus::Stopped)]
#[case(&[500, 500, 620], RunStatus::Running)]
fn classifies_oldest_against_newest(#[case] counters: &[i64], #[case] expected: RunStatus) {
    let img = MemoryImage::new().with_file("LOGGER.GAM", log(counters));
    let table = MemorySink::new();
    let mut t = Tailer::new(img, clock(), settings()).with_table_sink(table.clone());

    match t.poll_once() {
        CycleOutcome::Forwarded { status, table: Delivery::Sent, .. } => assert_eq!(status, expected),
        other => panic!("unexpected outcome {other:?}"),
    }
    let rows = table.recorded().rows;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, expected);
    assert_eq!(rows[0].counter, counters[2]);
}

#[test]
fn observation_carries_identity_and_zone() {
    let img = MemoryImage::new().with_file("LOGGER.GAM", log(&[1, 2, 3]));
    let table = MemorySink::new();
    let mut t = Tailer::new(img, clock(), settings()).with_table_sink(table.clone());
    t.poll_once();

    let obs = &table.recorded().rows[0];
    assert_eq!(obs.timestamp, "2024-01-15T08:02:00-05:00");
    assert_eq!(obs.pi_timestamp, "2024-01-15T13:30:00Z");
    assert_eq!(obs.machine, "CDL Line 1");
    assert_eq!(obs.location_name, "Coteau-du-Lac");
    assert_eq!(obs.location, "POINT(-74.1771 45.3053)");
    assert_eq!(obs.minute_id, 2);
}

#[rstest]
#[case("01-05-2024 08:30:00;510;45.2;46.0;44.8;46.0;47.1;48.0;0;0;12.5;11.9;1450;1390;500")]
#[case("not a record;1;2")]
#[case("32-13-2024 08:30:00;510;45.2;46.0;44.8;46.0;47.1;48.0;0;0;12.5;11.9;1450;1390;500;0")]
#[case("01-05-2024 08:30:00;510;hot;46.0;44.8;46.0;47.1;48.0;0;0;12.5;11.9;1450;1390;500;0")]
fn malformed_newest_never_reaches_a_sink(#[case] newest: &str) {
    let content = format!("{HEADER}\n{}\n{}\n{newest}\n", rec(0, 1), rec(1, 2));
    let img = MemoryImage::new().with_file("LOGGER.GAM", content);
    let sink = MemorySink::new();
    let mut t = Tailer::new(img, clock(), settings())
        .with_table_sink(sink.clone())
        .with_document_sink(sink.clone());

    assert_eq!(t.poll_once(), CycleOutcome::Malformed);
    let seen = sink.recorded();
    assert!(seen.rows.is_empty());
    assert!(seen.upserts.is_empty());
}

#[test]
fn missing_and_unreadable_logs_skip_the_cycle() {
    let mut t = Tailer::new(MemoryImage::new(), clock(), settings());
    assert_eq!(t.poll_once(), CycleOutcome::NoLogFile);

    let mut t = Tailer::new(BrokenImage::new("mtype timed out"), clock(), settings());
    assert_eq!(t.poll_once(), CycleOutcome::ReadFailed);
}

#[test]
fn failing_table_sink_does_not_block_documents() {
    let img = MemoryImage::new().with_file("LOGGER.GAM", log(&[1, 2, 3]));
    let table = MemorySink::new();
    let docs = MemorySink::new();
    table.fail(true);
    let mut t = Tailer::new(img, clock(), settings())
        .with_table_sink(table.clone())
        .with_document_sink(docs.clone());

    assert_eq!(
        t.poll_once(),
        CycleOutcome::Forwarded {
            status: RunStatus::Running,
            table: Delivery::Failed,
            document: Delivery::Sent,
        }
    );
    assert_eq!(docs.recorded().upserts.len(), 1);

    // not retried within the cycle, but the next cycle sends it
    table.fail(false);
    assert!(matches!(
        t.poll_once(),
        CycleOutcome::Forwarded { table: Delivery::Sent, .. }
    ));
    assert_eq!(table.recorded().rows.len(), 1);
}

#[test]
fn failing_document_sink_does_not_block_table() {
    let img = MemoryImage::new().with_file("LOGGER.GAM", log(&[1, 2, 3]));
    let table = MemorySink::new();
    let docs = MemorySink::new();
    docs.fail(true);
    let mut t = Tailer::new(img, clock(), settings())
        .with_table_sink(table.clone())
        .with_document_sink(docs);

    assert!(matches!(
        t.poll_once(),
        CycleOutcome::Forwarded { table: Delivery::Sent, document: Delivery::Failed, .. }
    ));
    assert_eq!(table.recorded().rows.len(), 1);
    assert_eq!(t.last_status(), None);
}

#[test]
fn unchanged_log_is_appended_once() {
    let img = MemoryImage::new().with_file("LOGGER.GAM", log(&[7, 7, 7]));
    let table = MemorySink::new();
    let docs = MemorySink::new();
    let c = clock();
    let mut t = Tailer::new(img.clone(), c.clone(), settings())
        .with_table_sink(table.clone())
        .with_document_sink(docs.clone());

    t.poll_once();
    c.advance(Duration::from_secs(1));
    assert!(matches!(
        t.poll_once(),
        CycleOutcome::Forwarded { table: Delivery::Suppressed, document: Delivery::Sent, .. }
    ));
    assert_eq!(table.recorded().rows.len(), 1);
    assert_eq!(docs.recorded().upserts.len(), 2);

    img.insert("LOGGER.GAM", log(&[7, 7, 7, 8]));
    t.poll_once();
    assert_eq!(table.recorded().rows.len(), 2);
}

#[test]
fn document_sink_sees_previous_status() {
    let img = MemoryImage::new().with_file("LOGGER.GAM", log(&[1, 1, 1]));
    let docs = MemorySink::new();
    let mut t = Tailer::new(img.clone(), clock(), settings()).with_document_sink(docs.clone());

    t.poll_once();
    t.poll_once();
    img.insert("LOGGER.GAM", log(&[1, 1, 1, 5]));
    t.poll_once();

    let previous: Vec<_> = docs
        .recorded()
        .upserts
        .iter()
        .map(|(obs, prev)| (obs.status, *prev))
        .collect();
    assert_eq!(
        previous,
        vec![
            (RunStatus::Stopped, None),
            (RunStatus::Stopped, Some(RunStatus::Stopped)),
            (RunStatus::Running, Some(RunStatus::Stopped)),
        ]
    );
    assert_eq!(t.last_status(), Some(RunStatus::Running));
}

#[test]
fn torn_reads_degrade_to_skipped_cycles() {
    let script = [
        ScriptedRead::Content(log(&[1, 2, 3])),
        ScriptedRead::Content(format!("{HEADER}\n")),
        ScriptedRead::Fail("mcopy busy".into()),
        ScriptedRead::Missing,
        ScriptedRead::Content(log(&[1, 2, 3, 4])),
    ];
    let mut t = Tailer::new(ScriptedImage::new(script), clock(), settings());
    let outcomes: Vec<_> = (0..5).map(|_| t.poll_once()).collect();
    assert!(matches!(outcomes[0], CycleOutcome::Forwarded { .. }));
    assert_eq!(outcomes[1], CycleOutcome::NotEnoughLines(1));
    assert_eq!(outcomes[2], CycleOutcome::ReadFailed);
    assert_eq!(outcomes[3], CycleOutcome::NoLogFile);
    assert!(matches!(outcomes[4], CycleOutcome::Forwarded { .. }));
}

/// Clock that raises the stop flag after a fixed number of sleeps.
#[derive(Clone)]
struct StopAfter {
    inner: ManualClock,
    stop: Arc<AtomicBool>,
    after: usize,
}

impl Clock for StopAfter {
    fn wall(&self) -> SystemTime {
        self.inner.wall()
    }

    fn sleep(&self, d: Duration) {
        self.inner.sleep(d);
        if self.inner.sleeps() >= self.after {
            self.stop.store(true, Ordering::Relaxed);
        }
    }
}

#[test]
fn run_stops_when_flag_is_set() {
    let stop = Arc::new(AtomicBool::new(false));
    let inner = ManualClock::default();
    let c = StopAfter {
        inner: inner.clone(),
        stop: stop.clone(),
        after: 3,
    };
    let img = MemoryImage::new().with_file("LOGGER.GAM", log(&[1, 2, 3]));
    let mut t = Tailer::new(img.clone(), c, settings());

    assert_eq!(t.run(&stop), 3);
    assert_eq!(img.reads(), 3);
    assert_eq!(inner.sleeps(), 3);
    assert_eq!(inner.wall(), SystemTime::UNIX_EPOCH + Duration::from_secs(3));
}

#[test]
fn run_does_nothing_when_already_stopped() {
    let stop = AtomicBool::new(true);
    let img = MemoryImage::new().with_file("LOGGER.GAM", log(&[1, 2, 3]));
    let mut t = Tailer::new(img.clone(), clock(), settings());
    assert_eq!(t.run(&stop), 0);
    assert_eq!(img.reads(), 0);
}

#[test]
fn restart_resumes_from_the_stored_table() {
    let dir = tempfile::tempdir().unwrap();
    let rows = dir.path().join("rows.csv");
    let img = MemoryImage::new().with_file("LOGGER.GAM", log(&[3, 4, 5]));

    let mut first = Tailer::new(img.clone(), clock(), settings())
        .with_table_sink(CsvTableSink::new(&rows));
    assert!(matches!(
        first.poll_once(),
        CycleOutcome::Forwarded { table: Delivery::Sent, .. }
    ));
    drop(first);

    let c = clock();
    c.advance(Duration::from_secs(60));
    let docs = MemorySink::new();
    let mut second = Tailer::new(img.clone(), c, settings())
        .with_table_sink(CsvTableSink::new(&rows))
        .with_document_sink(docs.clone());
    assert_eq!(second.last_status(), Some(RunStatus::Running));
    assert_eq!(
        second.poll_once(),
        CycleOutcome::Forwarded {
            status: RunStatus::Running,
            table: Delivery::Suppressed,
            document: Delivery::Sent,
        }
    );
    assert_eq!(docs.recorded().upserts[0].1, Some(RunStatus::Running));

    let mut rdr = csv::Reader::from_path(&rows).unwrap();
    assert_eq!(rdr.records().count(), 1);

    img.insert("LOGGER.GAM", log(&[3, 4, 5, 6]));
    assert!(matches!(
        second.poll_once(),
        CycleOutcome::Forwarded { table: Delivery::Sent, .. }
    ));
}

#[test]
fn rows_of_another_machine_are_not_resumed() {
    let table = MemorySink::new();
    let img = MemoryImage::new().with_file("LOGGER.GAM", log(&[3, 4, 5]));
    let other = TailerSettings {
        identity: MachineIdentity {
            name: "CDL Line 2".into(),
            ..settings().identity
        },
        ..settings()
    };
    let mut t = Tailer::new(img.clone(), clock(), other).with_table_sink(table.clone());
    t.poll_once();

    let t = Tailer::new(img, clock(), settings()).with_table_sink(table.clone());
    assert_eq!(t.last_status(), None);
}

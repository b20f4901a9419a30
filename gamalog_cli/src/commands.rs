//! Subcommand bodies: image and sink assembly from config, then the core calls.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use gamalog_config::Config;
use gamalog_core::{
    CsvTableSink, CycleOutcome, DocumentSink, FailReason, JsonDocumentSink, LogHeader, NullSink,
    RotationResult, Rotator, RotatorSettings, Simulator, SimulatorSettings, TableSink, Tailer,
    TailerSettings,
};
use gamalog_image::Mtools;
use gamalog_traits::SystemClock;
use serde_json::{Value, json};

pub fn build_image(cfg: &Config) -> Mtools {
    Mtools::new(&cfg.image.path)
        .with_tools(cfg.image.mtype.clone(), cfg.image.mcopy.clone())
        .with_timeout(Duration::from_millis(cfg.image.timeout_ms))
}

fn table_sink(cfg: &Config) -> Box<dyn TableSink> {
    match &cfg.sinks.table_csv {
        Some(path) => {
            tracing::info!(path = %path.display(), "table sink: csv");
            Box::new(CsvTableSink::new(path))
        }
        None => Box::new(NullSink),
    }
}

fn document_sink(cfg: &Config) -> Box<dyn DocumentSink> {
    match &cfg.sinks.document_json {
        Some(path) => {
            tracing::info!(path = %path.display(), "document sink: json");
            Box::new(JsonDocumentSink::new(path))
        }
        None => Box::new(NullSink),
    }
}

pub fn outcome_json(outcome: &CycleOutcome) -> Value {
    match outcome {
        CycleOutcome::NoLogFile => json!({ "outcome": "NoLogFile" }),
        CycleOutcome::ReadFailed => json!({ "outcome": "ReadFailed" }),
        CycleOutcome::NotEnoughLines(n) => json!({ "outcome": "NotEnoughLines", "lines": n }),
        CycleOutcome::Malformed => json!({ "outcome": "Malformed" }),
        CycleOutcome::Forwarded {
            status,
            table,
            document,
        } => json!({
            "outcome": "Forwarded",
            "status": status.as_str(),
            "table": format!("{table:?}"),
            "document": format!("{document:?}"),
        }),
    }
}

pub fn run_tail(
    cfg: &Config,
    interval_ms: Option<u64>,
    once: bool,
    json_out: bool,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<()> {
    let mut settings = TailerSettings::from(cfg);
    if let Some(ms) = interval_ms {
        if ms == 0 {
            eyre::bail!("--interval-ms must be >= 1");
        }
        settings.interval = Duration::from_millis(ms);
    }

    let mut tailer = Tailer::new(build_image(cfg), SystemClock::new(), settings)
        .with_table_sink(table_sink(cfg))
        .with_document_sink(document_sink(cfg));

    if once {
        let outcome = tailer.poll_once();
        if json_out {
            println!("{}", outcome_json(&outcome));
        } else {
            println!("cycle: {outcome:?}");
        }
        return Ok(());
    }

    tailer.run(&shutdown);
    Ok(())
}

pub fn rotation_json(result: &RotationResult) -> Value {
    match result {
        RotationResult::Rotated { kept, archived } => {
            json!({ "result": result.name(), "kept": kept, "archived": archived })
        }
        RotationResult::Skipped(_) => json!({ "result": result.name() }),
        RotationResult::Failed(reason) => {
            json!({ "result": result.name(), "message": fail_detail(reason) })
        }
    }
}

fn fail_detail(reason: &FailReason) -> &str {
    match reason {
        FailReason::Lock(m)
        | FailReason::LogReadError(m)
        | FailReason::BackupReadError(m)
        | FailReason::BackupWriteError(m)
        | FailReason::LogWriteError(m) => m,
    }
}

/// One rotation pass; the caller maps a failed result to its exit code.
pub fn run_rotate(cfg: &Config, json_out: bool) -> RotationResult {
    let mut rotator = Rotator::new(build_image(cfg), RotatorSettings::from(cfg));
    let result = rotator.rotate();
    if json_out {
        println!("{}", rotation_json(&result));
    } else {
        match &result {
            RotationResult::Rotated { kept, archived } => {
                println!("rotated: kept {kept} lines, archived {archived}");
            }
            RotationResult::Skipped(_) => println!("skipped: {}", result.name()),
            RotationResult::Failed(reason) => {
                eprintln!("rotation failed: {}: {}", result.name(), fail_detail(reason));
            }
        }
    }
    result
}

pub fn run_simulate(
    cfg: &Config,
    count: Option<u64>,
    interval_ms: Option<u64>,
    step_secs: Option<u64>,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<u64> {
    let mut settings = SimulatorSettings::from(cfg);
    if let Some(s) = step_secs {
        if s == 0 {
            eyre::bail!("--step-secs must be >= 1");
        }
        settings.step = Duration::from_secs(s);
    }
    let interval = Duration::from_millis(interval_ms.unwrap_or(cfg.simulator.interval_ms));

    let mut sim = Simulator::new(build_image(cfg), settings);
    let written = sim.run(&SystemClock::new(), interval, count, &shutdown)?;
    println!("appended {written} records");
    Ok(written)
}

pub fn self_check(cfg: &Config, json_out: bool) -> eyre::Result<()> {
    let image = build_image(cfg);
    image.ensure_available()?;
    let log = image.read(&cfg.image.log_file)?;

    let (lines, header) = match &log {
        Some(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            let header = text.lines().next().and_then(LogHeader::parse);
            (Some(text.lines().count()), header)
        }
        None => {
            tracing::warn!(file = %cfg.image.log_file, "log file not present in image");
            (None, None)
        }
    };
    let backup_present = image.read(&cfg.image.backup_file)?.is_some();

    if json_out {
        println!(
            "{}",
            json!({
                "status": "ok",
                "image": cfg.image.path.display().to_string(),
                "log_lines": lines,
                "log_type": header.as_ref().map(|h| h.log_type.clone()),
                "log_version": header.as_ref().map(|h| h.version.clone()),
                "backup_present": backup_present,
            })
        );
    } else {
        println!("self-check ok");
        println!("  image: {}", cfg.image.path.display());
        match (lines, &header) {
            (Some(n), Some(h)) => println!(
                "  {}: {n} lines ({} v{}, {})",
                cfg.image.log_file, h.log_type, h.version, h.metric
            ),
            (Some(n), None) => println!("  {}: {n} lines (no header)", cfg.image.log_file),
            _ => println!("  {}: absent", cfg.image.log_file),
        }
        println!(
            "  {}: {}",
            cfg.image.backup_file,
            if backup_present { "present" } else { "absent" }
        );
    }
    Ok(())
}

pub fn health(cfg: &Config, json_out: bool) -> eyre::Result<()> {
    let image_present = cfg.image.path.is_file();
    let sink_dirs_ok = [&cfg.sinks.table_csv, &cfg.sinks.document_json]
        .into_iter()
        .flatten()
        .all(|p| {
            p.parent()
                .is_none_or(|d| d.as_os_str().is_empty() || d.is_dir())
        });

    let status = if image_present && sink_dirs_ok {
        "ok"
    } else {
        "degraded"
    };
    if json_out {
        println!(
            "{}",
            json!({
                "status": status,
                "image": cfg.image.path.display().to_string(),
                "image_present": image_present,
                "sink_dirs_ok": sink_dirs_ok,
                "machine": cfg.machine.name,
            })
        );
    } else {
        println!("{status}");
    }

    if !image_present {
        eyre::bail!("image {} does not exist", cfg.image.path.display());
    }
    if !sink_dirs_ok {
        eyre::bail!("a configured sink directory does not exist");
    }
    Ok(())
}

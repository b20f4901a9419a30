use std::io::{self, Read};
use std::process::{Child, Command, Output, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::error::{ImageError, Result};

/// Run `cmd` to completion, capturing stdout/stderr, killing it if it outlives `timeout`.
///
/// Pipes are drained on helper threads so a chatty child cannot block on a full pipe
/// while we wait on it. A pipe that fails mid-read is an error, never short output.
pub fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<Output> {
    let tool = cmd.get_program().to_string_lossy().into_owned();
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ImageError::ToolMissing(tool.clone()),
            _ => ImageError::Io(e),
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match child.wait_timeout(timeout)? {
        Some(status) => status,
        None => {
            kill_quietly(&mut child);
            let after_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(tool = %tool, timeout_ms = after_ms, "killed hung subprocess");
            return Err(ImageError::Timeout { tool, after_ms });
        }
    };

    let stdout = join_drain(stdout).inspect_err(|e| {
        tracing::warn!(tool = %tool, error = %e, "reading subprocess stdout failed");
    })?;
    let stderr = join_drain(stderr)?;
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

type Drain = JoinHandle<io::Result<Vec<u8>>>;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Drain> {
    pipe.map(|mut p| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            p.read_to_end(&mut buf).map(|_| buf)
        })
    })
}

fn join_drain(handle: Option<Drain>) -> Result<Vec<u8>> {
    let Some(h) = handle else {
        return Ok(Vec::new());
    };
    match h.join() {
        Ok(read) => Ok(read?),
        Err(_) => Err(ImageError::Io(io::Error::other("pipe reader thread panicked"))),
    }
}

fn kill_quietly(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

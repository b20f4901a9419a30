//! mtools-backed access to files inside a FAT image (`mtype` / `mcopy -o`).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use gamalog_traits::{BoxError, ImageFs};

use crate::error::{ImageError, Result};
use crate::util::run_with_timeout;

/// Default bound on a single mtools invocation.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Reads and writes files in a raw FAT image without mounting it.
#[derive(Debug, Clone)]
pub struct Mtools {
    image: PathBuf,
    mtype: String,
    mcopy: String,
    timeout: Duration,
}

impl Mtools {
    pub fn new(image: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            mtype: "mtype".to_string(),
            mcopy: "mcopy".to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Override the tool binaries (absolute paths or names on PATH).
    pub fn with_tools(mut self, mtype: impl Into<String>, mcopy: impl Into<String>) -> Self {
        self.mtype = mtype.into();
        self.mcopy = mcopy.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn image(&self) -> &Path {
        &self.image
    }

    /// Check that the toolset is installed and the image file exists.
    pub fn ensure_available(&self) -> Result<()> {
        if !self.image.exists() {
            return Err(ImageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("image {} does not exist", self.image.display()),
            )));
        }
        let mut cmd = Command::new(&self.mtype);
        cmd.arg("--version");
        let out = run_with_timeout(cmd, self.timeout)?;
        if !out.status.success() {
            return Err(tool_error(&self.mtype, &out));
        }
        Ok(())
    }

    fn command(&self, tool: &str) -> Command {
        let mut cmd = Command::new(tool);
        // Gadget images are often written by firmware with odd geometry.
        cmd.env("MTOOLS_SKIP_CHECK", "1");
        cmd.arg("-i").arg(&self.image);
        cmd
    }

    pub fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut cmd = self.command(&self.mtype);
        cmd.arg(inner_path(name));
        let out = run_with_timeout(cmd, self.timeout)?;
        if out.status.success() {
            tracing::trace!(file = name, bytes = out.stdout.len(), "mtype ok");
            return Ok(Some(out.stdout));
        }
        if reports_missing(&out.stderr) {
            tracing::debug!(file = name, "file not present in image");
            return Ok(None);
        }
        Err(tool_error(&self.mtype, &out))
    }

    pub fn write(&self, name: &str, contents: &[u8]) -> Result<()> {
        let mut staged = tempfile::NamedTempFile::new()?;
        staged.write_all(contents)?;
        staged.flush()?;

        let mut cmd = self.command(&self.mcopy);
        cmd.arg("-o").arg(staged.path()).arg(inner_path(name));
        let out = run_with_timeout(cmd, self.timeout)?;
        if !out.status.success() {
            return Err(tool_error(&self.mcopy, &out));
        }
        tracing::trace!(file = name, bytes = contents.len(), "mcopy ok");
        Ok(())
    }
}

impl ImageFs for Mtools {
    fn read_file(&mut self, name: &str) -> std::result::Result<Option<Vec<u8>>, BoxError> {
        Ok(self.read(name)?)
    }

    fn write_file(&mut self, name: &str, contents: &[u8]) -> std::result::Result<(), BoxError> {
        Ok(self.write(name, contents)?)
    }
}

/// `::/NAME` addresses a file at the root of the image given with `-i`.
pub fn inner_path(name: &str) -> String {
    format!("::/{}", name.trim_start_matches('/'))
}

fn reports_missing(stderr: &[u8]) -> bool {
    let msg = String::from_utf8_lossy(stderr).to_ascii_lowercase();
    msg.contains("not found") && !msg.contains("cannot initialize")
}

fn tool_error(tool: &str, out: &std::process::Output) -> ImageError {
    ImageError::Tool {
        tool: tool.to_string(),
        status: out.status.code(),
        stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
    }
}

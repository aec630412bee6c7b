//! Command port abstraction over the lru_gen debugfs interface.
//!
//! The same pseudo-file serves the generation ledger on read and accepts
//! directives on write. Each operation opens, uses and closes its own handle;
//! a read session and a write session never overlap.

use ahash::AHashSet as HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default location of the lru_gen interface.
pub const DEFAULT_LRU_GEN_PATH: &str = "/sys/kernel/debug/lru_gen";

/// Read/write capability on a generation ledger.
pub trait CommandPort {
    /// Reads the complete current ledger text.
    fn read_all(&mut self) -> io::Result<String>;

    /// Writes one directive line (without trailing newline).
    fn write_line(&mut self, line: &str) -> io::Result<()>;
}

impl<P: CommandPort + ?Sized> CommandPort for &mut P {
    fn read_all(&mut self) -> io::Result<String> {
        (**self).read_all()
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        (**self).write_line(line)
    }
}

impl<P: CommandPort + ?Sized> CommandPort for Box<P> {
    fn read_all(&mut self) -> io::Result<String> {
        (**self).read_all()
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        (**self).write_line(line)
    }
}

/// Port used by a configured driver: the live file, optionally dry-run.
pub type BoxedPort = Box<dyn CommandPort + Send>;

/// The kernel's lru_gen pseudo-file.
#[derive(Debug, Clone)]
pub struct LruGenFile {
    path: PathBuf,
}

impl LruGenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CommandPort for LruGenFile {
    fn read_all(&mut self) -> io::Result<String> {
        fs::read_to_string(&self.path)
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        // One write per command; the kernel parses each write separately
        file.write_all(format!("{line}\n").as_bytes())?;
        file.flush()
    }
}

/// One operation observed by a [`MemoryPort`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortEvent {
    Read,
    Write(String),
}

/// In-memory port for tests and offline runs.
///
/// Serves a fixed ledger text and records every operation in order.
#[derive(Debug, Clone, Default)]
pub struct MemoryPort {
    ledger: String,
    events: Vec<PortEvent>,
    failing_cgroups: HashSet<String>,
    fail_reads: bool,
}

impl MemoryPort {
    pub fn new(ledger: impl Into<String>) -> Self {
        Self {
            ledger: ledger.into(),
            ..Self::default()
        }
    }

    /// Makes writes addressed to `cgroup_id` fail with `NotFound`.
    pub fn fail_cgroup(mut self, cgroup_id: impl Into<String>) -> Self {
        self.failing_cgroups.insert(cgroup_id.into());
        self
    }

    /// Makes every read fail.
    pub fn fail_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn events(&self) -> &[PortEvent] {
        &self.events
    }

    /// Successfully written lines, in order.
    pub fn written(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                PortEvent::Write(line) => Some(line.as_str()),
                PortEvent::Read => None,
            })
            .collect()
    }
}

impl CommandPort for MemoryPort {
    fn read_all(&mut self) -> io::Result<String> {
        if self.fail_reads {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read refused"));
        }
        self.events.push(PortEvent::Read);
        Ok(self.ledger.clone())
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let target = line.split_whitespace().nth(1).unwrap_or_default();
        if self.failing_cgroups.contains(target) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("memcg {target} not found"),
            ));
        }
        self.events.push(PortEvent::Write(line.to_string()));
        Ok(())
    }
}

/// Port wrapper that reads through but only logs writes.
#[derive(Debug, Clone, Default)]
pub struct DryRunPort<P> {
    inner: P,
    suppressed: Vec<String>,
}

impl<P: CommandPort> DryRunPort<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            suppressed: Vec::new(),
        }
    }

    /// Lines that would have been written.
    pub fn suppressed(&self) -> &[String] {
        &self.suppressed
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: CommandPort> CommandPort for DryRunPort<P> {
    fn read_all(&mut self) -> io::Result<String> {
        self.inner.read_all()
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        info!("[dry-run] would write '{}'", line);
        self.suppressed.push(line.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_gen_file_scoped_read_and_write() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "memcg 5\n 1 0 0 0\n").unwrap();

        let mut port = LruGenFile::new(file.path());
        assert_eq!(port.read_all().unwrap(), "memcg 5\n 1 0 0 0\n");

        port.write_line("- 5 0 1 0").unwrap();
        // Without O_TRUNC the line overwrites the start of a regular file
        let content = fs::read_to_string(file.path()).unwrap();
        assert!(content.starts_with("- 5 0 1 0\n"));
    }

    #[test]
    fn test_lru_gen_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut port = LruGenFile::new(dir.path().join("lru_gen"));
        assert_eq!(
            port.read_all().unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
        assert_eq!(
            port.write_line("+ 5 0 1 0 0").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_memory_port_records_events() {
        let mut port = MemoryPort::new("memcg 1\n").fail_cgroup("7");
        assert_eq!(port.read_all().unwrap(), "memcg 1\n");
        port.write_line("- 1 0 3 0").unwrap();
        assert!(port.write_line("- 7 0 3 0").is_err());

        assert_eq!(
            port.events(),
            &[PortEvent::Read, PortEvent::Write("- 1 0 3 0".to_string())]
        );
        assert_eq!(port.written(), vec!["- 1 0 3 0"]);
    }

    #[test]
    fn test_dry_run_suppresses_writes() {
        let mut port = DryRunPort::new(MemoryPort::new("memcg 1\n"));
        assert_eq!(port.read_all().unwrap(), "memcg 1\n");
        port.write_line("+ 1 0 4 0 0").unwrap();
        assert_eq!(port.suppressed(), &["+ 1 0 4 0 0".to_string()]);
        assert!(port.into_inner().written().is_empty());
    }
}

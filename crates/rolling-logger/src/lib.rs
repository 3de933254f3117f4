//! Rolling File Logger
//!
//! Installs a `tracing` subscriber that writes to a size-rotated set of log
//! files (`{app}.log`, `{app}.1.log`, ...) and keeps the most recent lines in
//! an in-memory circular buffer. Records emitted through the `log` facade are
//! captured as well.

use std::collections::VecDeque;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;

/// Default size before the active file is rotated (1 MiB)
pub const DEFAULT_MAX_BYTES: u64 = 1024 * 1024;
/// Default number of rotated files kept next to the active one
pub const DEFAULT_MAX_FILES: usize = 3;
/// Default number of lines kept in memory
pub const DEFAULT_BUFFER_LINES: usize = 500;

static WRITER: OnceLock<RollingFileWriter> = OnceLock::new();

#[derive(Debug)]
pub enum LoggerError {
    Io(io::Error),
    AlreadyInitialized(String),
}

impl fmt::Display for LoggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggerError::Io(e) => write!(f, "log file error: {}", e),
            LoggerError::AlreadyInitialized(msg) => write!(f, "logger already initialized: {}", msg),
        }
    }
}

impl std::error::Error for LoggerError {}

impl From<io::Error> for LoggerError {
    fn from(e: io::Error) -> Self {
        LoggerError::Io(e)
    }
}

/// Knobs for [`init_logger_with`]
#[derive(Debug, Clone)]
pub struct LoggerOptions {
    pub level: log::LevelFilter,
    pub max_bytes: u64,
    pub max_files: usize,
    pub buffer_lines: usize,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            level: log::LevelFilter::Info,
            max_bytes: DEFAULT_MAX_BYTES,
            max_files: DEFAULT_MAX_FILES,
            buffer_lines: DEFAULT_BUFFER_LINES,
        }
    }
}

/// Initialize the global logger with default options.
pub fn init_logger(log_dir: impl AsRef<Path>, app_name: &str) -> Result<(), LoggerError> {
    init_logger_with(log_dir, app_name, LoggerOptions::default())
}

/// Initialize the global logger.
///
/// Fails if a global subscriber is already installed.
pub fn init_logger_with(
    log_dir: impl AsRef<Path>,
    app_name: &str,
    options: LoggerOptions,
) -> Result<(), LoggerError> {
    let writer = RollingFileWriter::new(
        log_dir,
        app_name,
        options.max_bytes,
        options.max_files,
        options.buffer_lines,
    )?;

    tracing_subscriber::fmt()
        .with_writer(writer.clone())
        .with_ansi(false)
        .with_timer(LocalTimer)
        .with_max_level(to_tracing_level(options.level))
        .try_init()
        .map_err(|e| LoggerError::AlreadyInitialized(e.to_string()))?;

    let _ = WRITER.set(writer);
    Ok(())
}

pub fn info(msg: &str) {
    tracing::info!("{}", msg);
}

/// Most recent log lines, oldest first. Empty before `init_logger`.
pub fn recent_lines() -> Vec<String> {
    WRITER.get().map(|w| w.recent_lines()).unwrap_or_default()
}

fn to_tracing_level(level: log::LevelFilter) -> LevelFilter {
    match level {
        log::LevelFilter::Off => LevelFilter::OFF,
        log::LevelFilter::Error => LevelFilter::ERROR,
        log::LevelFilter::Warn => LevelFilter::WARN,
        log::LevelFilter::Info => LevelFilter::INFO,
        log::LevelFilter::Debug => LevelFilter::DEBUG,
        log::LevelFilter::Trace => LevelFilter::TRACE,
    }
}

/// Local wall-clock timestamps with millisecond precision
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

// ========================
// Rolling Writer
// ========================

/// Shared handle to the rotating file set. Cheap to clone.
#[derive(Clone)]
pub struct RollingFileWriter {
    state: Arc<Mutex<RollingState>>,
}

struct RollingState {
    dir: PathBuf,
    app_name: String,
    max_bytes: u64,
    max_files: usize,
    file: File,
    written: u64,
    lines: VecDeque<String>,
    line_capacity: usize,
    partial: String,
}

impl RollingFileWriter {
    pub fn new(
        dir: impl AsRef<Path>,
        app_name: &str,
        max_bytes: u64,
        max_files: usize,
        line_capacity: usize,
    ) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let active = dir.join(format!("{}.log", app_name));
        let file = OpenOptions::new().create(true).append(true).open(&active)?;
        let written = file.metadata()?.len();

        Ok(Self {
            state: Arc::new(Mutex::new(RollingState {
                dir,
                app_name: app_name.to_string(),
                max_bytes,
                max_files,
                file,
                written,
                lines: VecDeque::with_capacity(line_capacity),
                line_capacity,
                partial: String::new(),
            })),
        })
    }

    /// Path of the file currently being written
    pub fn active_path(&self) -> PathBuf {
        match self.state.lock() {
            Ok(state) => state.active_path(),
            Err(poisoned) => poisoned.into_inner().active_path(),
        }
    }

    pub fn recent_lines(&self) -> Vec<String> {
        match self.state.lock() {
            Ok(state) => state.lines.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().lines.iter().cloned().collect(),
        }
    }
}

impl<'a> MakeWriter<'a> for RollingFileWriter {
    type Writer = RollingFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for RollingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer poisoned"))?;
        state.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer poisoned"))?;
        state.file.flush()
    }
}

impl RollingState {
    fn active_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.app_name))
    }

    fn archive_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.{}.log", self.app_name, index))
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(buf)?;
        self.written += buf.len() as u64;
        self.remember(buf);
        Ok(buf.len())
    }

    /// Shift `{app}.N.log` up by one, dropping the oldest, then start a fresh active file.
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.max_files > 0 {
            let oldest = self.archive_path(self.max_files);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for index in (1..self.max_files).rev() {
                let from = self.archive_path(index);
                if from.exists() {
                    fs::rename(&from, self.archive_path(index + 1))?;
                }
            }
            fs::rename(self.active_path(), self.archive_path(1))?;
        }

        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.active_path())?;
        self.written = 0;
        Ok(())
    }

    fn remember(&mut self, buf: &[u8]) {
        if self.line_capacity == 0 {
            return;
        }
        self.partial.push_str(&String::from_utf8_lossy(buf));

        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            if self.lines.len() == self.line_capacity {
                self.lines.pop_front();
            }
            self.lines.push_back(line.trim_end_matches(['\r', '\n']).to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_line(writer: &mut RollingFileWriter, line: &str) {
        writer.write_all(format!("{}\n", line).as_bytes()).unwrap();
    }

    #[test]
    fn test_rotates_when_size_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RollingFileWriter::new(dir.path(), "app", 32, 2, 10).unwrap();

        write_line(&mut writer, "first line of the log file");
        write_line(&mut writer, "second line of the log file");

        assert!(dir.path().join("app.log").exists());
        assert!(dir.path().join("app.1.log").exists());
        let active = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert_eq!(active, "second line of the log file\n");
    }

    #[test]
    fn test_keeps_at_most_max_files_archives() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RollingFileWriter::new(dir.path(), "app", 8, 2, 10).unwrap();

        for i in 0..5 {
            write_line(&mut writer, &format!("line number {}", i));
        }

        assert!(dir.path().join("app.1.log").exists());
        assert!(dir.path().join("app.2.log").exists());
        assert!(!dir.path().join("app.3.log").exists());
        let newest_archive = fs::read_to_string(dir.path().join("app.1.log")).unwrap();
        assert_eq!(newest_archive, "line number 3\n");
    }

    #[test]
    fn test_circular_buffer_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RollingFileWriter::new(dir.path(), "app", DEFAULT_MAX_BYTES, 1, 2).unwrap();

        write_line(&mut writer, "a");
        write_line(&mut writer, "b");
        write_line(&mut writer, "c");

        assert_eq!(writer.recent_lines(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_partial_writes_join_into_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RollingFileWriter::new(dir.path(), "app", DEFAULT_MAX_BYTES, 1, 4).unwrap();

        writer.write_all(b"hello ").unwrap();
        assert!(writer.recent_lines().is_empty());
        writer.write_all(b"world\n").unwrap();

        assert_eq!(writer.recent_lines(), vec!["hello world".to_string()]);
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log"), "earlier\n").unwrap();

        let mut writer = RollingFileWriter::new(dir.path(), "app", DEFAULT_MAX_BYTES, 1, 4).unwrap();
        write_line(&mut writer, "later");

        let content = fs::read_to_string(writer.active_path()).unwrap();
        assert_eq!(content, "earlier\nlater\n");
    }
}

//! Logging setup.
//!
//! Every log line goes to stderr and to a daily file `log_YYYY-MM-DD.txt`
//! (the file `/log` serves). Both outputs pass through [`RedactionPatterns`]
//! so bot tokens never reach a log.

use chrono::{Local, NaiveDate};
use regex::Regex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Name of the log file for a given day
#[must_use]
pub fn log_file_name(date: NaiveDate) -> String {
    format!("log_{}.txt", date.format("%Y-%m-%d"))
}

/// Path of the log file for a given day inside `dir`
#[must_use]
pub fn log_file_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(log_file_name(date))
}

/// Regex patterns for redacting sensitive data
pub struct RedactionPatterns {
    url_token: Regex,
    bare_token: Regex,
    prefixed_token: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            url_token: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            bare_token: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            prefixed_token: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
        })
    }

    /// Replace every bot token in `input` with a placeholder
    #[must_use]
    pub fn redact(&self, input: &str) -> String {
        let output = self
            .url_token
            .replace_all(input, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        let output = self
            .bare_token
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        self.prefixed_token
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string()
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // Report the original length; the redacted text may differ in size.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

/// Append-only log file that switches to a new file when the day changes
pub struct DailyLogFile {
    dir: PathBuf,
    current: Mutex<Option<(NaiveDate, File)>>,
}

impl DailyLogFile {
    /// Log files will be created inside `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: Mutex::new(None),
        }
    }

    /// Append `buf` to the file for `date`, opening it if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written.
    pub fn append(&self, date: NaiveDate, buf: &[u8]) -> io::Result<()> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let is_open = matches!(current.as_ref(), Some((day, _)) if *day == date);
        if !is_open {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file_path(&self.dir, date))?;
            *current = Some((date, file));
        }
        match current.as_mut() {
            Some((_, file)) => file.write_all(buf),
            None => Ok(()),
        }
    }
}

struct DailyLogWriter {
    file: Arc<DailyLogFile>,
}

impl Write for DailyLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.append(Local::now().date_naive(), buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
///
/// # Errors
///
/// Returns an error if the redaction patterns cannot be compiled or the log
/// directory cannot be created.
pub fn init(log_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let patterns = Arc::new(RedactionPatterns::new()?);
    std::fs::create_dir_all(log_dir)?;

    let daily = Arc::new(DailyLogFile::new(log_dir));
    let file_writer = RedactingMakeWriter::new(
        move || DailyLogWriter {
            file: daily.clone(),
        },
        patterns.clone(),
    );
    let stderr_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(stderr_writer))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, day).expect("valid date")
    }

    #[test]
    fn test_log_file_name() {
        assert_eq!(log_file_name(date(8)), "log_2026-10-08.txt");
    }

    #[test]
    fn test_redacts_bot_tokens() -> Result<(), regex::Error> {
        let patterns = RedactionPatterns::new()?;
        let token = "123456789:AAbbCCddEEffGGhhIIjjKKllMMnnOOppQQr";

        let url = format!("GET https://api.telegram.org/bot{token}/getUpdates failed");
        let redacted = patterns.redact(&url);
        assert!(!redacted.contains(token), "token leaked: {redacted}");
        assert!(redacted.contains("[TELEGRAM_TOKEN]"));

        let bare = patterns.redact(&format!("token={token}"));
        assert!(!bare.contains(token), "token leaked: {bare}");

        assert_eq!(patterns.redact("nothing secret"), "nothing secret");
        Ok(())
    }

    #[test]
    fn test_daily_file_rotates_by_date() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = DailyLogFile::new(dir.path());

        file.append(date(17), b"first\n")?;
        file.append(date(17), b"second\n")?;
        file.append(date(18), b"third\n")?;

        assert_eq!(
            std::fs::read_to_string(log_file_path(dir.path(), date(17)))?,
            "first\nsecond\n"
        );
        assert_eq!(
            std::fs::read_to_string(log_file_path(dir.path(), date(18)))?,
            "third\n"
        );
        Ok(())
    }

    #[test]
    fn test_redacting_writer_masks_output() -> Result<(), Box<dyn std::error::Error>> {
        let patterns = Arc::new(RedactionPatterns::new()?);
        let mut writer = RedactingWriter::new(Vec::new(), patterns);
        writer.write_all(b"bot123456789:secretpart leaked")?;
        let written = String::from_utf8(writer.inner)?;
        assert_eq!(written, "bot123456789:[TELEGRAM_TOKEN] leaked");
        Ok(())
    }
}

//! A `tracing-subscriber` writer that starts a new file every calendar day.
//!
//! Files are named `<prefix>.YYYY-MM-DD.log`. The day is computed in a
//! configurable timezone, and each formatted event is written with a single
//! `write` call while holding the file lock, so an event always lands whole in
//! exactly one day's file.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing_subscriber::fmt::MakeWriter;

/// Source of the current time. Swapped out in tests to cross midnight on demand.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct ActiveFile {
    date: NaiveDate,
    file: File,
}

struct Inner {
    dir: PathBuf,
    prefix: String,
    timezone: Tz,
    retention_days: u32,
    clock: Arc<dyn Clock>,
    active: Mutex<Option<ActiveFile>>,
}

#[derive(Clone)]
pub struct DailyFileWriter {
    inner: Arc<Inner>,
}

impl DailyFileWriter {
    pub fn new(
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        timezone: Tz,
        retention_days: u32,
    ) -> io::Result<Self> {
        Self::with_clock(dir, prefix, timezone, retention_days, Arc::new(SystemClock))
    }

    pub fn with_clock(
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        timezone: Tz,
        retention_days: u32,
        clock: Arc<dyn Clock>,
    ) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        Ok(Self {
            inner: Arc::new(Inner {
                dir,
                prefix: prefix.into(),
                timezone,
                retention_days,
                clock,
                active: Mutex::new(None),
            }),
        })
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.inner.path_for(date)
    }
}

impl Inner {
    fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}.{}.log", self.prefix, date.format("%Y-%m-%d")))
    }

    fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.timezone).date_naive()
    }

    fn write_entry(&self, buf: &[u8]) -> io::Result<()> {
        let today = self.today();
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(current) = active.as_mut() {
            if current.date == today {
                return current.file.write_all(buf);
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(today))?;
        file.write_all(buf)?;
        *active = Some(ActiveFile { date: today, file });
        drop(active);

        self.prune(today);
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        match active.as_mut() {
            Some(current) => current.file.flush(),
            None => Ok(()),
        }
    }

    /// Remove our own files that fell out of the retention window.
    fn prune(&self, today: NaiveDate) {
        let cutoff = today - Duration::days(i64::from(self.retention_days));
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                eprintln!("log retention: cannot read {}: {}", self.dir.display(), e);
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Some(date) = self.date_of(&path) else {
                continue;
            };
            // The active day is never pruned, even with zero retention.
            if date <= cutoff && date != today {
                if let Err(e) = std::fs::remove_file(&path) {
                    eprintln!("log retention: cannot remove {}: {}", path.display(), e);
                }
            }
        }
    }

    fn date_of(&self, path: &Path) -> Option<NaiveDate> {
        let name = path.file_name()?.to_str()?;
        let date = name
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix('.')?
            .strip_suffix(".log")?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }
}

/// Per-event handle handed out to the formatter.
pub struct DailyLogHandle {
    inner: Arc<Inner>,
}

impl Write for DailyLogHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // A broken log file must never take a command down with it.
        if let Err(e) = self.inner.write_entry(buf) {
            let mut stderr = io::stderr();
            let _ = writeln!(stderr, "log file write failed: {}", e);
            let _ = stderr.write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = self.inner.flush();
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for DailyFileWriter {
    type Writer = DailyLogHandle;

    fn make_writer(&'a self) -> Self::Writer {
        DailyLogHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

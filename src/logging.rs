//! Subscriber setup: console or rolling file output plus a bounded history
//! of recent events for post-mortem dumps.

use crate::config::{Config, LogConfig};
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub const LOG_FILE_NAME: &str = "doctype-prune.log";

/// Keep this alive until exit so buffered file output is flushed.
pub struct Logging {
    pub history: LogHistory,
    _guard: Option<WorkerGuard>,
}

pub fn init(cfg: &Config) -> Result<Logging> {
    // RUST_LOG wins over debug_level
    let filter = EnvFilter::builder()
        .with_default_directive(cfg.level().into())
        .from_env_lossy();
    let history = LogHistory::new(cfg.log.history_lines);

    let (writer, guard) = if cfg.log.to_file {
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender(&cfg.log)?);
        (BoxMakeWriter::new(file_writer), Some(guard))
    } else {
        (BoxMakeWriter::new(std::io::stderr), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(guard.is_none())
                .with_target(false)
                .compact(),
        )
        .with(history.clone())
        .try_init()
        .map_err(|e| Error::Msg(format!("failed to install logger: {e}")))?;

    Ok(Logging {
        history,
        _guard: guard,
    })
}

/// Rolling appender for `doctype-prune.log` under `log.dir`, pruned to
/// `log.max_log_files` rotated files.
pub fn file_appender(log: &LogConfig) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(&log.dir)?;
    let rotation = match log.rotation.as_str() {
        "hourly" => Rotation::HOURLY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    };
    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(LOG_FILE_NAME);
    if let Some(n) = log.max_log_files {
        builder = builder.max_log_files(n);
    }
    builder
        .build(&log.dir)
        .map_err(|e| Error::Msg(format!("failed to open log in {}: {e}", log.dir.display())))
}

/// Ring buffer of the most recent formatted events.
#[derive(Clone)]
pub struct LogHistory {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl LogHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn render(&self) -> String {
        self.lines().join("\n")
    }

    fn push(&self, line: String) {
        let mut lines = self.lines.lock().unwrap_or_else(|p| p.into_inner());
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }
}

impl<S: Subscriber> Layer<S> for LogHistory {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if self.capacity == 0 {
            return;
        }
        let meta = event.metadata();
        let mut line = format!("{:>5} {}:", meta.level(), meta.target());
        event.record(&mut LineVisitor(&mut line));
        self.push(line);
    }
}

struct LineVisitor<'a>(&'a mut String);

impl Visit for LineVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            let _ = write!(self.0, " {value}");
        } else {
            let _ = write!(self.0, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.0, " {value:?}");
        } else {
            let _ = write!(self.0, " {}={value:?}", field.name());
        }
    }
}

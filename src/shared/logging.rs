use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "log level must be one of: debug, info, warn, error (got `{other}`)"
            )),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub timestamp: String,
    pub level: LogLevel,
    pub event: String,
    pub message: String,
    pub fields: Map<String, Value>,
}

impl LogEvent {
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Flat JSON object: fixed keys first, then context and call-site fields.
    pub fn to_json(&self) -> Value {
        let mut payload = Map::new();
        payload.insert(
            "timestamp".to_string(),
            Value::String(self.timestamp.clone()),
        );
        payload.insert(
            "level".to_string(),
            Value::String(self.level.as_str().to_string()),
        );
        payload.insert("event".to_string(), Value::String(self.event.clone()));
        payload.insert("message".to_string(), Value::String(self.message.clone()));
        for (key, value) in &self.fields {
            payload.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(payload)
    }
}

pub trait LogSink: Send + Sync {
    fn emit(&self, event: &LogEvent);
}

/// Writes one JSON line per event to stderr. Stdout belongs to the protocol.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrLogSink;

impl LogSink for StderrLogSink {
    fn emit(&self, event: &LogEvent) {
        let Ok(line) = serde_json::to_string(&event.to_json()) else {
            return;
        };
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{line}");
    }
}

#[derive(Debug, Clone)]
pub struct FileLogSink {
    path: PathBuf,
}

impl FileLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileLogSink {
    fn emit(&self, event: &LogEvent) {
        let Ok(line) = serde_json::to_string(&event.to_json()) else {
            return;
        };
        if let Some(parent) = self.path.parent() {
            if fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let Ok(mut file) = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
        else {
            return;
        };
        let _ = writeln!(file, "{line}");
    }
}

/// Keeps every event in memory; used to assert on emitted diagnostics.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    events: Mutex<Vec<LogEvent>>,
}

impl MemoryLogSink {
    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events_named(&self, event: &str) -> Vec<LogEvent> {
        self.events()
            .into_iter()
            .filter(|entry| entry.event == event)
            .collect()
    }
}

impl LogSink for MemoryLogSink {
    fn emit(&self, event: &LogEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Structured logger handed to each component and run. Cloning is cheap and
/// scoping with [`Logger::with_field`] never affects the parent.
#[derive(Clone)]
pub struct Logger {
    sinks: Vec<Arc<dyn LogSink>>,
    min_level: LogLevel,
    context: Map<String, Value>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("sinks", &self.sinks.len())
            .field("min_level", &self.min_level)
            .field("context", &self.context)
            .finish()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::discard()
    }
}

impl Logger {
    pub fn new(min_level: LogLevel) -> Self {
        Self {
            sinks: Vec::new(),
            min_level,
            context: Map::new(),
        }
    }

    pub fn discard() -> Self {
        Self::new(LogLevel::Error)
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level && !self.sinks.is_empty()
    }

    pub fn log(&self, level: LogLevel, event: &str, message: &str, fields: &[(&str, Value)]) {
        if !self.enabled(level) {
            return;
        }
        let mut merged = self.context.clone();
        for (key, value) in fields {
            merged.insert((*key).to_string(), value.clone());
        }
        let entry = LogEvent {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level,
            event: event.to_string(),
            message: message.to_string(),
            fields: merged,
        };
        for sink in &self.sinks {
            sink.emit(&entry);
        }
    }

    pub fn debug(&self, event: &str, message: &str, fields: &[(&str, Value)]) {
        self.log(LogLevel::Debug, event, message, fields);
    }

    pub fn info(&self, event: &str, message: &str, fields: &[(&str, Value)]) {
        self.log(LogLevel::Info, event, message, fields);
    }

    pub fn warn(&self, event: &str, message: &str, fields: &[(&str, Value)]) {
        self.log(LogLevel::Warn, event, message, fields);
    }

    pub fn error(&self, event: &str, message: &str, fields: &[(&str, Value)]) {
        self.log(LogLevel::Error, event, message, fields);
    }
}

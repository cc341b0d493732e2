// src/logger.rs
// Scoped logging with colored output and timestamps

use chrono::{DateTime, Local};
use colored::*;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "{}", " DEBUG ".on_blue().bold().white()),
            LogLevel::Info => write!(f, "{}", " INFO ".on_magenta().bold().white()),
            LogLevel::Warn => write!(f, "{}", " WARN ".on_yellow().bold().black()),
            LogLevel::Error => write!(f, "{}", " ERROR ".on_red().bold().white()),
        }
    }
}

/// A single log line handed to a [`LogSink`].
#[derive(Debug, Clone, Copy)]
pub struct LogRecord<'a> {
    pub level: LogLevel,
    pub scope: &'a str,
    pub message: &'a str,
}

/// Destination for log records.
///
/// Sinks must never fail the caller: write errors are dropped.
pub trait LogSink: Send + Sync {
    fn write(&self, record: &LogRecord<'_>);
}

/// Writes colored lines to stdout.
pub struct ConsoleSink {
    pub enable_timestamps: bool,
}

impl ConsoleSink {
    pub fn new(enable_timestamps: bool) -> Self {
        Self { enable_timestamps }
    }

    fn format_timestamp(&self) -> String {
        if self.enable_timestamps {
            let now: DateTime<Local> = Local::now();
            format!("{} ", now.format("%Y-%m-%d %H:%M:%S").to_string().dimmed())
        } else {
            String::new()
        }
    }
}

impl LogSink for ConsoleSink {
    fn write(&self, record: &LogRecord<'_>) {
        let timestamp = self.format_timestamp();
        let scope = if record.scope.is_empty() {
            String::new()
        } else {
            format!("{} ", record.scope.cyan())
        };
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{}{} {}{}", timestamp, record.level, scope, record.message);
    }
}

#[derive(Clone)]
pub struct Logger {
    scope: Arc<str>,
    min_level: LogLevel,
    sink: Arc<dyn LogSink>,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            scope: Arc::from(""),
            min_level: LogLevel::Info,
            sink: Arc::new(ConsoleSink::new(true)),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replaces the sink with a console sink, so call it before [`Logger::with_sink`].
    pub fn with_timestamps(self, enable: bool) -> Self {
        self.with_sink(Arc::new(ConsoleSink::new(enable)))
    }

    /// Debug lines (including the access log) are dropped unless enabled.
    pub fn with_debug(mut self, enable: bool) -> Self {
        self.min_level = if enable { LogLevel::Debug } else { LogLevel::Info };
        self
    }

    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = Arc::from(scope);
        self
    }

    /// Child logger sharing the sink and level, scoped under `name`.
    pub fn sublogger(&self, name: &str) -> Logger {
        let scope = if self.scope.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.scope, name)
        };
        Logger {
            scope: Arc::from(scope),
            min_level: self.min_level,
            sink: Arc::clone(&self.sink),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if !self.is_enabled(level) {
            return;
        }
        self.sink.write(&LogRecord {
            level,
            scope: &self.scope,
            message,
        });
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    pub fn startup_info(&self, name: &str, version: &str) {
        let startup_msg = format!("Starting {} v{}", name.bold(), version.bold());
        self.info(&startup_msg);
    }

    pub fn server_info(&self, resource: &str, local_url: &str, network_url: Option<&str>) {
        self.info(&format!("Resource: {}", resource.bold()));

        if !atty::is(atty::Stream::Stdout) {
            self.info(&format!("Accepting connections at {}", local_url));
            return;
        }

        let mut message = format!("{}", "Serving!".green().bold());

        if !local_url.is_empty() {
            let prefix = if network_url.is_some() { "- " } else { "" };
            let space = if network_url.is_some() { "    " } else { "  " };
            message += &format!(
                "\n\n{}{}{}{}",
                "Local:".bold(),
                space,
                prefix,
                local_url.bright_cyan()
            );
        }

        if let Some(network) = network_url {
            message += &format!("\n{}  {}", "- Network:".bold(), network.bright_cyan());
        }

        print_boxed(&message);
    }

    pub fn shutdown_message(&self) {
        self.info("Shutting down web server...");
    }

    pub fn force_shutdown_message(&self) {
        self.warn("Force-closing all open sockets...");
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("scope", &self.scope)
            .field("min_level", &self.min_level)
            .finish()
    }
}

pub fn print_boxed(message: &str) {
    let lines: Vec<&str> = message.lines().collect();
    if lines.is_empty() {
        return;
    }

    let max_width = lines
        .iter()
        .map(|line| strip_ansi_codes(line).chars().count())
        .max()
        .unwrap_or(0);

    let box_width = max_width + 4;

    let mut out = io::stdout().lock();
    let _ = writeln!(out, "┌{}┐", "─".repeat(box_width));
    let _ = writeln!(out, "│{}│", " ".repeat(box_width));

    for line in lines {
        let stripped_len = strip_ansi_codes(line).chars().count();
        let padding = " ".repeat((box_width - stripped_len) / 2);
        let right_padding = " ".repeat(box_width - stripped_len - padding.len());
        let _ = writeln!(out, "│{}{}{}│", padding, line, right_padding);
    }

    let _ = writeln!(out, "│{}│", " ".repeat(box_width));
    let _ = writeln!(out, "└{}┘", "─".repeat(box_width));
    let _ = writeln!(out);
}

// Width calculation ignores ANSI color codes
fn strip_ansi_codes(s: &str) -> String {
    let mut result = String::new();
    let mut in_escape = false;
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            in_escape = true;
            continue;
        }

        if in_escape {
            if ch.is_ascii_alphabetic() {
                in_escape = false;
            }
            continue;
        }

        result.push(ch);
    }

    result
}

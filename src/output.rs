//! Pluggable output sinks. Rather than reach for a logging crate, this follows the
//! source codebase's own convention: a small `Message` enum plus an `Output` trait that
//! concrete sinks (plain text, a rotating debug log, or nothing at all) implement.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Local;
use colored::Colorize;

#[derive(Debug, Clone)]
pub enum Message {
    Debug(String),
    Info(String),
    Warning(String),
    Error(String),
}

impl Message {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Message::Debug(s) | Message::Info(s) | Message::Warning(s) | Message::Error(s) => s,
        }
    }
}

pub trait Output: Send + Sync {
    fn send(&self, message: Message);
}

/// Discards everything. The default when no `--debug`/extra output sink was requested.
pub struct NoneOutput;

impl Output for NoneOutput {
    fn send(&self, _message: Message) {}
}

/// Writes to stdout, colored by severity, skipping `Debug` unless `verbose` is set.
pub struct TextOutput {
    verbose: bool,
}

impl TextOutput {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Output for TextOutput {
    fn send(&self, message: Message) {
        match &message {
            Message::Debug(s) => {
                if self.verbose {
                    println!("{}", s.dimmed());
                }
            }
            Message::Info(s) => println!("{s}"),
            Message::Warning(s) => println!("{}", s.yellow()),
            Message::Error(s) => eprintln!("{}", s.red().bold()),
        }
    }
}

/// Appends every message, timestamped, to a file. Used for `--debug` traffic logs that
/// outlive the run without cluttering the console.
pub struct LoggerOutput {
    file: Mutex<std::fs::File>,
}

impl LoggerOutput {
    pub fn new(path: PathBuf) -> crate::error::Res<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| crate::error::AppError::Io { path, source })?;
        Ok(Self { file: Mutex::new(file) })
    }
}

impl Output for LoggerOutput {
    fn send(&self, message: Message) {
        let prefix = match &message {
            Message::Debug(_) => "DEBUG",
            Message::Info(_) => "INFO",
            Message::Warning(_) => "WARN",
            Message::Error(_) => "ERROR",
        };
        let line = format!("[{}] {prefix} {}\n", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"), message.text());
        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(line.as_bytes());
        }
    }
}

/// Fans a message out to every configured sink, the way `OutputBuilder` composes
/// several concrete outputs behind one handle.
pub struct FanOutOutput {
    sinks: Vec<Arc<dyn Output>>,
}

impl FanOutOutput {
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn Output>>) -> Self {
        Self { sinks }
    }
}

impl Output for FanOutOutput {
    fn send(&self, message: Message) {
        for sink in &self.sinks {
            sink.send(message.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingOutput(AtomicUsize);
    impl Output for CountingOutput {
        fn send(&self, _message: Message) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn none_output_drops_everything() {
        let out = NoneOutput;
        out.send(Message::Info("hello".into()));
    }

    #[test]
    fn fan_out_reaches_every_sink() {
        let counter = Arc::new(CountingOutput(AtomicUsize::new(0)));
        let fan_out = FanOutOutput::new(vec![counter.clone()]);
        fan_out.send(Message::Info("one".into()));
        fan_out.send(Message::Error("two".into()));
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn message_text_extracts_payload() {
        assert_eq!(Message::Warning("careful".into()).text(), "careful");
    }
}

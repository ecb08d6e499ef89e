use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// One line of the verbose trace.
#[derive(Debug, Clone)]
pub struct TraceEntry {
    pub elapsed: Duration,
    pub message: String,
}

/// Human-readable record of what happened while serving one request.
///
/// Created by the caller, passed by `&mut` through every component, and read
/// back whether or not the request succeeded.
#[derive(Debug, Clone)]
pub struct Trace {
    started: Instant,
    started_at: DateTime<Utc>,
    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    pub fn append(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(%message, "trace");
        self.entries.push(TraceEntry {
            elapsed: self.started.elapsed(),
            message,
        });
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.message.clone()).collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.message.contains(needle))
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}", entry.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_keeps_order() {
        let mut trace = Trace::new();
        trace.append("first");
        trace.append(String::from("second"));

        assert_eq!(trace.lines(), vec!["first", "second"]);
        assert!(trace.contains("sec"));
        assert_eq!(trace.to_string(), "first\nsecond\n");
        assert!(trace.entries()[0].elapsed <= trace.entries()[1].elapsed);
    }

    /// Records the level of every event it sees.
    #[derive(Default)]
    struct LevelRecorder {
        levels: std::sync::Mutex<Vec<tracing::Level>>,
    }

    impl tracing::Subscriber for LevelRecorder {
        fn enabled(&self, _metadata: &tracing::Metadata<'_>) -> bool {
            true
        }
        fn new_span(&self, _span: &tracing::span::Attributes<'_>) -> tracing::span::Id {
            tracing::span::Id::from_u64(1)
        }
        fn record(&self, _span: &tracing::span::Id, _values: &tracing::span::Record<'_>) {}
        fn record_follows_from(&self, _span: &tracing::span::Id, _follows: &tracing::span::Id) {}
        fn event(&self, event: &tracing::Event<'_>) {
            self.levels.lock().unwrap().push(*event.metadata().level());
        }
        fn enter(&self, _span: &tracing::span::Id) {}
        fn exit(&self, _span: &tracing::span::Id) {}
    }

    #[test]
    fn test_entries_are_mirrored_at_debug() {
        let recorder = std::sync::Arc::new(LevelRecorder::default());
        tracing::subscriber::with_default(recorder.clone(), || {
            Trace::new().append("Authenticated user: alice");
        });
        assert_eq!(*recorder.levels.lock().unwrap(), vec![tracing::Level::DEBUG]);
    }
}

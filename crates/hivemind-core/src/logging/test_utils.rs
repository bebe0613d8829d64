//! In-memory log capture for tests.
//!
//! [`capture_logs`] sets a thread-local subscriber that records every event.
//! Assertions look events up by level and message text.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

/// One recorded event.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    /// Event level.
    pub level: Level,
    /// The formatted message.
    pub message: String,
    /// Every other field, keyed by name.
    pub fields: BTreeMap<String, String>,
}

/// Events recorded since [`capture_logs`] was called.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<CapturedEvent>>>);

impl CapturedLogs {
    /// First event at `level` whose message contains `message`.
    pub fn find(&self, level: Level, message: &str) -> Option<CapturedEvent> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| e.level == level && e.message.contains(message))
            .cloned()
    }

    /// Whether [`find`](Self::find) would return an event.
    pub fn has_event(&self, level: Level, message: &str) -> bool {
        self.find(level, message).is_some()
    }
}

struct Recorder(CapturedLogs);

impl<S: Subscriber> Layer<S> for Recorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        event.record(&mut fields);
        let captured = CapturedEvent {
            level: *event.metadata().level(),
            message: fields.message,
            fields: fields.rest,
        };
        self.0
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(captured);
    }
}

#[derive(Default)]
struct Fields {
    message: String,
    rest: BTreeMap<String, String>,
}

impl Fields {
    fn put(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            let _ = self.rest.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for Fields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        self.put(field, format!("{value:?}"));
    }
}

/// Record events on the current thread until the guard is dropped.
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::registry().with(Recorder(logs.clone()));
    (logs, tracing::subscriber::set_default(subscriber))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RequestId;

    #[test]
    fn finds_by_level_and_message() {
        let (logs, _guard) = capture_logs();
        tracing::debug!(id = %RequestId::new(7), "response for unknown id");

        assert!(logs.has_event(Level::DEBUG, "unknown id"));
        assert!(!logs.has_event(Level::WARN, "unknown id"));
    }

    #[test]
    fn display_and_str_fields_are_recorded() {
        let (logs, _guard) = capture_logs();
        tracing::warn!(id = %RequestId::new(3), name = "Model Error", "command failed");

        let event = logs.find(Level::WARN, "command failed").unwrap();
        assert_eq!(event.fields["id"], "3");
        assert_eq!(event.fields["name"], "Model Error");
    }
}

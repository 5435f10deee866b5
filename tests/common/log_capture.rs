//! Tracing capture for asserting on events the engine emits.
//!
//! The subscriber is installed as the thread default, so only events from
//! the current thread are seen. Async tests must run on the current-thread
//! runtime (the `#[tokio::test]` default).
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// One recorded event: level, message, and its structured fields.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

/// Records events until dropped.
pub struct TestLogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
    _guard: tracing::subscriber::DefaultGuard,
}

impl TestLogCapture {
    pub fn start() -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(Recorder {
            events: Arc::clone(&events),
        });
        Self {
            events,
            _guard: tracing::subscriber::set_default(subscriber),
        }
    }

    fn events(&self) -> MutexGuard<'_, Vec<CapturedEvent>> {
        self.events.lock().unwrap()
    }

    fn messages(&self) -> Vec<String> {
        self.events().iter().map(|e| e.message.clone()).collect()
    }

    pub fn assert_logged(&self, needle: &str) {
        assert!(
            self.count(needle) > 0,
            "no event containing {needle:?}; saw {:#?}",
            self.messages()
        );
    }

    pub fn assert_logged_at_level(&self, level: Level, needle: &str) {
        let found = self
            .events()
            .iter()
            .any(|e| e.level == level && e.message.contains(needle));
        assert!(
            found,
            "no {level} event containing {needle:?}; saw {:#?}",
            self.messages()
        );
    }

    pub fn assert_no_errors(&self) {
        let errors: Vec<CapturedEvent> = self
            .events()
            .iter()
            .filter(|e| e.level == Level::ERROR)
            .cloned()
            .collect();
        assert!(errors.is_empty(), "Unexpected errors: {errors:#?}");
    }

    /// Assert some event carries `field` with a value containing `value`.
    pub fn assert_field_logged(&self, field: &str, value: &str) {
        let found = self
            .events()
            .iter()
            .any(|e| e.fields.get(field).is_some_and(|v| v.contains(value)));
        assert!(found, "no event with {field}={value:?}");
    }

    /// Events whose message contains `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| e.message.contains(needle))
            .count()
    }

    /// `field` on the first event whose message contains `needle`.
    pub fn field_of(&self, needle: &str, field: &str) -> Option<String> {
        self.events()
            .iter()
            .find(|e| e.message.contains(needle))
            .and_then(|e| e.fields.get(field).cloned())
    }
}

struct Recorder {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: Subscriber> Layer<S> for Recorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = FieldMap::default();
        event.record(&mut fields);
        let message = fields.0.remove("message").unwrap_or_default();
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message,
            fields: fields.0,
        });
    }
}

#[derive(Default)]
struct FieldMap(BTreeMap<String, String>);

impl Visit for FieldMap {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

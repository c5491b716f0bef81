//! Synchronous audit-event emission for deep-mode operations.
//!
//! Every privileged deep-mode step reports through [`AuditEmitter::emit`]
//! before its effect lands in the result. Emission is fail-closed: an error
//! from the caller's sink aborts the in-flight operation rather than
//! silently losing the record.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::config::AuditCallback;
use crate::error::AnalysisError;

/// A structured record of a privileged operation.
///
/// Constructed per emission and handed to the caller's callback; the engine
/// never persists events.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub event_type: String,
    pub data: Value,
    /// Seconds since the Unix epoch at emission time.
    pub timestamp: u64,
}

impl AuditEvent {
    fn new(event_type: &str, data: Value) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            event_type: event_type.to_string(),
            data,
            timestamp,
        }
    }

    /// The callback payload: `data` with the timestamp folded in.
    fn payload(&self) -> Value {
        let mut payload = self.data.clone();
        if let Value::Object(map) = &mut payload {
            map.insert("timestamp".to_string(), Value::from(self.timestamp));
        }
        payload
    }
}

/// Serializes audit delivery to the caller-supplied callback.
///
/// Callbacks are not required to be safe for concurrent invocation, so all
/// emissions go through one mutex; the emitted stream is never interleaved.
pub(crate) struct AuditEmitter {
    callback: AuditCallback,
    lock: Mutex<()>,
}

impl AuditEmitter {
    pub(crate) fn new(callback: AuditCallback) -> Self {
        Self {
            callback,
            lock: Mutex::new(()),
        }
    }

    /// Deliver one event synchronously.
    ///
    /// A callback error surfaces as [`AnalysisError::AuditCallback`] and
    /// must abort the operation that triggered the emission.
    pub(crate) fn emit(&self, event_type: &str, data: Value) -> Result<(), AnalysisError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let event = AuditEvent::new(event_type, data);
        (self.callback)(&event.event_type, &event.payload())
            .map_err(AnalysisError::AuditCallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_emit_delivers_event_with_timestamp() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let emitter = AuditEmitter::new(Arc::new(move |event_type, data| {
            sink.lock()
                .unwrap()
                .push((event_type.to_string(), data.clone()));
            Ok(())
        }));

        emitter
            .emit("resolution", json!({"target": "os"}))
            .unwrap();

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "resolution");
        assert_eq!(events[0].1["target"], "os");
        assert!(events[0].1["timestamp"].is_u64());
    }

    #[test]
    fn test_callback_error_propagates() {
        let emitter = AuditEmitter::new(Arc::new(|_, _| Err("sink down".into())));
        let err = emitter.emit("resolution", json!({})).unwrap_err();
        assert!(matches!(err, AnalysisError::AuditCallback(_)));
    }

    #[test]
    fn test_emissions_are_counted_exactly_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let emitter = AuditEmitter::new(Arc::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        for _ in 0..5 {
            emitter.emit("resolution", json!({})).unwrap();
        }
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }
}

//! Recording lifecycle observer
//!
//! Captures every [`LifecycleEvent`] it receives so tests can assert on
//! callback order and on the record state each callback saw.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use paranoia_core::callbacks::{HookError, HookPoint, LifecycleEvent, LifecycleObserver};
use paranoia_core::record::Record;
use std::sync::Mutex;

/// An event captured by [`RecordingObserver`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Hook point fired.
    pub point: HookPoint,
    /// Snapshot of the record at that point.
    pub record: Record,
}

/// Observer that records events and can be told to fail.
///
/// # Example
///
/// ```
/// use paranoia_core::callbacks::{HookPoint, LifecycleEvent, LifecycleObserver};
/// use paranoia_core::record::Record;
/// use paranoia_testing::RecordingObserver;
///
/// let observer = RecordingObserver::new();
/// let post = Record::new("Post");
/// observer
///     .on_event(&LifecycleEvent { point: HookPoint::BeforeDestroy, record: &post })
///     .unwrap();
/// assert_eq!(observer.points(), vec![HookPoint::BeforeDestroy]);
/// ```
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RecordedEvent>>,
    fail_at: Option<HookPoint>,
}

impl RecordingObserver {
    /// Observer that accepts every event
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Observer that rejects events at `point` (after recording them)
    #[must_use]
    pub fn failing_at(point: HookPoint) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail_at: Some(point),
        }
    }

    /// Every event received so far
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Hook points received so far, in order
    #[must_use]
    pub fn points(&self) -> Vec<HookPoint> {
        self.events.lock().unwrap().iter().map(|e| e.point).collect()
    }

    /// Events received at `point`
    #[must_use]
    pub fn events_at(&self, point: HookPoint) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.point == point)
            .cloned()
            .collect()
    }

    /// Forget every recorded event
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl LifecycleObserver for RecordingObserver {
    fn on_event(&self, event: &LifecycleEvent<'_>) -> Result<(), HookError> {
        self.events.lock().unwrap().push(RecordedEvent {
            point: event.point,
            record: event.record.clone(),
        });
        if self.fail_at == Some(event.point) {
            return Err(HookError::new(format!("observer rejected {}", event.point)));
        }
        Ok(())
    }
}

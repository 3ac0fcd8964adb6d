//! Lifecycle hooks and observers.
//!
//! Two ways to react to lifecycle transitions:
//!
//! - **Hooks**: plain closures registered per record type and hook point.
//! - **Observers**: [`LifecycleObserver`] implementations subscribed per
//!   record type, notified with a [`LifecycleEvent`].
//!
//! For a given point, hooks run in registration order, then observers in
//! subscription order. The first failure stops dispatch and is reported as
//! [`ParanoidError::Callback`].

use crate::error::ParanoidError;
use crate::record::Record;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Where in the lifecycle a callback fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Before a destroy writes anything.
    BeforeDestroy,
    /// After a destroy wrote its markers, inside the transaction.
    AfterDestroy,
    /// After the outermost transaction of a destroy committed.
    AfterDestroyCommit,
    /// Before a recover cascades or clears its marker.
    BeforeRecover,
    /// After a recover saved the record, inside the transaction.
    AfterRecover,
}

impl HookPoint {
    /// Points every registered type supports.
    pub const DESTROY: [Self; 3] = [
        Self::BeforeDestroy,
        Self::AfterDestroy,
        Self::AfterDestroyCommit,
    ];

    /// Points installed when a type becomes paranoid.
    pub const RECOVER: [Self; 2] = [Self::BeforeRecover, Self::AfterRecover];

    /// Snake-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeDestroy => "before_destroy",
            Self::AfterDestroy => "after_destroy",
            Self::AfterDestroyCommit => "after_destroy_commit",
            Self::BeforeRecover => "before_recover",
            Self::AfterRecover => "after_recover",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a hook or observer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HookError(String);

impl HookError {
    /// Create a hook error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// A hook closure.
pub type Hook = Arc<dyn Fn(&Record) -> Result<(), HookError> + Send + Sync>;

/// Notification handed to observers.
#[derive(Clone, Copy, Debug)]
pub struct LifecycleEvent<'a> {
    /// The hook point being fired.
    pub point: HookPoint,
    /// The record, as it stands at that point.
    pub record: &'a Record,
}

/// Subscriber to lifecycle events of one record type.
///
/// # Examples
///
/// ```
/// use paranoia_core::callbacks::{HookError, LifecycleEvent, LifecycleObserver};
///
/// struct AuditLog;
///
/// impl LifecycleObserver for AuditLog {
///     fn on_event(&self, event: &LifecycleEvent<'_>) -> Result<(), HookError> {
///         println!("{} {}", event.point, event.record.record_type());
///         Ok(())
///     }
/// }
/// ```
pub trait LifecycleObserver: Send + Sync {
    /// Handle an event. Returning an error aborts the operation, except for
    /// [`HookPoint::AfterDestroyCommit`].
    ///
    /// # Errors
    ///
    /// Any [`HookError`] the observer chooses to report.
    fn on_event(&self, event: &LifecycleEvent<'_>) -> Result<(), HookError>;
}

/// Hooks and observers of every record type in a registry.
#[derive(Clone, Default)]
pub struct Callbacks {
    installed: HashSet<(String, HookPoint)>,
    hooks: HashMap<(String, HookPoint), Vec<Hook>>,
    observers: HashMap<String, Vec<Arc<dyn LifecycleObserver>>>,
}

impl Callbacks {
    /// Empty callback table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `points` available for `record_type`. Installing twice is a no-op.
    pub fn install(&mut self, record_type: &str, points: &[HookPoint]) {
        for point in points {
            self.installed.insert((record_type.to_string(), *point));
        }
    }

    /// Whether `point` has been installed for `record_type`.
    #[must_use]
    pub fn is_installed(&self, record_type: &str, point: HookPoint) -> bool {
        self.installed.contains(&(record_type.to_string(), point))
    }

    /// Append a hook. The caller checks installation first.
    pub fn add_hook(&mut self, record_type: &str, point: HookPoint, hook: Hook) {
        self.hooks
            .entry((record_type.to_string(), point))
            .or_default()
            .push(hook);
    }

    /// Subscribe an observer to every point of `record_type`.
    pub fn add_observer(&mut self, record_type: &str, observer: Arc<dyn LifecycleObserver>) {
        self.observers
            .entry(record_type.to_string())
            .or_default()
            .push(observer);
    }

    /// Number of hooks registered at `point` for `record_type`.
    #[must_use]
    pub fn hook_count(&self, record_type: &str, point: HookPoint) -> usize {
        self.hooks
            .get(&(record_type.to_string(), point))
            .map_or(0, Vec::len)
    }

    /// Run hooks then observers for `point` against `record`.
    ///
    /// # Errors
    ///
    /// Returns [`ParanoidError::Callback`] for the first failure; later
    /// callbacks do not run.
    pub fn dispatch(&self, point: HookPoint, record: &Record) -> Result<(), ParanoidError> {
        let record_type = record.record_type();
        let failed = |error: HookError| ParanoidError::Callback {
            record_type: record_type.to_string(),
            point,
            message: error.message().to_string(),
        };

        if let Some(hooks) = self.hooks.get(&(record_type.to_string(), point)) {
            for hook in hooks {
                hook(record).map_err(failed)?;
            }
        }

        if let Some(observers) = self.observers.get(record_type) {
            let event = LifecycleEvent { point, record };
            for observer in observers {
                observer.on_event(&event).map_err(failed)?;
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("installed", &self.installed.len())
            .field("hooks", &self.hooks.values().map(Vec::len).sum::<usize>())
            .field("observers", &self.observers.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

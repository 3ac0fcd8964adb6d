//! Lifecycle metrics.
//!
//! Counters are emitted through the `metrics` facade; installing an exporter
//! is left to the application. Every counter carries a `record_type` label.
//!
//! | counter | meaning |
//! |---|---|
//! | `paranoia_soft_deletes_total` | rows soft-deleted |
//! | `paranoia_permanent_deletes_total` | rows permanently deleted |
//! | `paranoia_recoveries_total` | rows recovered |
//! | `paranoia_rollbacks_total` | outermost operations rolled back |
//!
//! Counters are only incremented once the owning transaction committed.

use metrics::describe_counter;

/// Rows soft-deleted.
pub const SOFT_DELETES_TOTAL: &str = "paranoia_soft_deletes_total";
/// Rows permanently deleted.
pub const PERMANENT_DELETES_TOTAL: &str = "paranoia_permanent_deletes_total";
/// Rows recovered.
pub const RECOVERIES_TOTAL: &str = "paranoia_recoveries_total";
/// Operations rolled back.
pub const ROLLBACKS_TOTAL: &str = "paranoia_rollbacks_total";

/// A committed state change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Transition {
    SoftDeleted,
    PermanentlyDeleted,
    Recovered,
}

impl Transition {
    const fn counter(self) -> &'static str {
        match self {
            Self::SoftDeleted => SOFT_DELETES_TOTAL,
            Self::PermanentlyDeleted => PERMANENT_DELETES_TOTAL,
            Self::Recovered => RECOVERIES_TOTAL,
        }
    }
}

/// Register descriptions for every lifecycle counter.
///
/// Call once after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(SOFT_DELETES_TOTAL, "Total number of rows soft-deleted");
    describe_counter!(
        PERMANENT_DELETES_TOTAL,
        "Total number of rows permanently deleted"
    );
    describe_counter!(RECOVERIES_TOTAL, "Total number of rows recovered");
    describe_counter!(
        ROLLBACKS_TOTAL,
        "Total number of lifecycle operations rolled back"
    );
}

pub(crate) fn record_transition(transition: Transition, record_type: &str, count: u64) {
    metrics::counter!(transition.counter(), "record_type" => record_type.to_string())
        .increment(count);
}

pub(crate) fn record_rollback(record_type: &str) {
    metrics::counter!(ROLLBACKS_TOTAL, "record_type" => record_type.to_string()).increment(1);
}

//! # Paranoia Testing
//!
//! Testing utilities for paranoid record lifecycles.
//!
//! This crate provides:
//! - [`InMemoryStore`]: a `Persistence` backend with snapshot transactions
//!   and failure injection
//! - Controllable clocks ([`FixedClock`], [`ManualClock`])
//! - [`RecordingObserver`] for asserting on callbacks
//! - proptest strategies for domain values
//! - [`init_test_tracing`] for log output in tests
//!
//! ## Example
//!
//! ```ignore
//! use paranoia_testing::{InMemoryStore, ManualClock, init_test_tracing};
//!
//! #[tokio::test]
//! async fn soft_delete_hides_posts() {
//!     init_test_tracing();
//!     let store = Arc::new(InMemoryStore::new());
//!     let engine = ParanoidEngine::new(registry, store.clone())
//!         .with_clock(Arc::new(ManualClock::default()));
//!
//!     let mut post = store.insert(registry.new_record("Post")?);
//!     engine.destroy(&mut post).await?;
//!     assert_eq!(engine.model("Post")?.count().await?, 0);
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use paranoia_core::environment::Clock;

/// In-memory persistence
pub mod memory;

/// Recording observer
pub mod observer;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Duration, Utc};
    use std::sync::{Arc, Mutex};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use paranoia_testing::mocks::FixedClock;
    /// use paranoia_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to
    ///
    /// Clones share the same time, so a test can keep a handle while the
    /// engine owns another.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::Duration;
    /// use paranoia_core::environment::Clock;
    /// use paranoia_testing::mocks::{ManualClock, test_clock};
    ///
    /// let clock = ManualClock::new(test_clock().now());
    /// let start = clock.now();
    /// clock.advance(Duration::minutes(5));
    /// assert_eq!(clock.now() - start, Duration::minutes(5));
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock starting at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Jump to `time`
        ///
        /// # Panics
        ///
        /// Panics if the lock was poisoned by a panicking test thread.
        #[allow(clippy::unwrap_used)]
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap() = time;
        }

        /// Move forward by `by`
        ///
        /// # Panics
        ///
        /// Panics if the lock was poisoned by a panicking test thread.
        #[allow(clippy::unwrap_used)]
        pub fn advance(&self, by: Duration) {
            *self.time.lock().unwrap() += by;
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new(test_clock().now())
        }
    }

    impl Clock for ManualClock {
        #[allow(clippy::unwrap_used)]
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use super::{Duration, Utc};
    use crate::mocks::test_clock;
    use paranoia_core::column::{ColumnType, ParanoidColumnConfig};
    use paranoia_core::environment::Clock;
    use paranoia_core::value::FieldValue;
    use proptest::prelude::*;

    /// Any supported marker column type
    pub fn arb_column_type() -> impl Strategy<Value = ColumnType> {
        prop_oneof![
            Just(ColumnType::Time),
            Just(ColumnType::Boolean),
            Just(ColumnType::String),
        ]
    }

    /// A marker column named `marker` of any type
    pub fn arb_column() -> impl Strategy<Value = ParanoidColumnConfig> {
        arb_column_type().prop_map(|kind| ParanoidColumnConfig::new("marker", kind))
    }

    /// Offsets, in seconds, from the test clock's start
    pub fn arb_offset() -> impl Strategy<Value = i64> {
        0i64..86_400
    }

    /// A timestamp within one day of the test clock's start
    pub fn arb_time() -> impl Strategy<Value = chrono::DateTime<Utc>> {
        arb_offset().prop_map(|s| test_clock().now() + Duration::seconds(s))
    }

    /// Any value a column might hold
    pub fn arb_field_value() -> impl Strategy<Value = FieldValue> {
        prop_oneof![
            Just(FieldValue::Null),
            any::<bool>().prop_map(FieldValue::Bool),
            any::<i64>().prop_map(FieldValue::Int),
            "[a-z]{0,8}".prop_map(FieldValue::Text),
            arb_time().prop_map(FieldValue::Time),
        ]
    }
}

/// Install a `tracing` subscriber honouring `RUST_LOG`, once per process.
///
/// Output goes through the test writer so it is captured per test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    tracing::trace!("Test tracing initialised");
}

// Re-export commonly used items
pub use memory::{InMemoryStore, StoreStats, UpdateLog};
pub use mocks::{FixedClock, ManualClock, test_clock};
pub use observer::{RecordedEvent, RecordingObserver};

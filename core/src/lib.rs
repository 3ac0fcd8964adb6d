//! # Paranoia Core
//!
//! Types and traits for paranoid (soft-delete) record lifecycles.
//!
//! A *paranoid* record type marks deleted rows through one or more marker
//! columns instead of removing them. Deleted rows disappear from normal
//! reads and can later be recovered, optionally together with the
//! dependents that were deleted alongside them.
//!
//! ## Core Concepts
//!
//! - **Column configuration**: which marker columns a type uses and what they
//!   hold ([`column`], [`config`])
//! - **Scopes**: predicates that hide or expose deleted rows ([`predicate`],
//!   [`scope`])
//! - **Registry**: the immutable table of record types, associations and
//!   callbacks ([`registry`], [`association`], [`callbacks`])
//! - **Persistence**: the contract a storage backend implements
//!   ([`persistence`])
//!
//! The lifecycle engine itself lives in `paranoia-runtime`.
//!
//! ## Example
//!
//! ```
//! use paranoia_core::registry::Registry;
//! use paranoia_core::scope::ParanoidScope;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), paranoia_core::error::ConfigurationError> {
//! let mut builder = Registry::builder();
//! builder.configure("Post", &json!({ "column_type": "boolean", "column": "is_deleted" }))?;
//! let registry = builder.build();
//!
//! let config = registry.paranoid_config("Post").map(|c| ParanoidScope::new(c).not_deleted());
//! assert_eq!(config.map(|p| p.to_string()), Some("is_deleted = false".to_string()));
//! # Ok(())
//! # }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Duration, Utc};

pub mod association;
pub mod callbacks;
pub mod column;
pub mod config;
pub mod error;
pub mod persistence;
pub mod predicate;
pub mod record;
pub mod registry;
pub mod scope;
pub mod value;

pub use error::{ConfigurationError, ParanoidError, Result};

/// Environment module - injected dependencies
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time so deletion timestamps are testable
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{DateTime, Utc};
    /// use paranoia_core::environment::Clock;
    ///
    /// struct FixedClock {
    ///     time: DateTime<Utc>,
    /// }
    ///
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock reading the system time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

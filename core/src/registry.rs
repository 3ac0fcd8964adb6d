//! Write-once registry of record types.
//!
//! Record types, their associations, their paranoid configuration and their
//! callbacks are declared through a [`RegistryBuilder`] at startup. The
//! resulting [`Registry`] is immutable and meant to be shared behind an
//! `Arc`.
//!
//! # Examples
//!
//! ```
//! use paranoia_core::association::{Association, DependentMode};
//! use paranoia_core::registry::{ModelDescriptor, Registry};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), paranoia_core::error::ConfigurationError> {
//! let mut builder = Registry::builder();
//! builder
//!     .register(
//!         ModelDescriptor::new("Post").with_association(
//!             Association::has_many("comments", "Comment", "post_id")
//!                 .dependent(DependentMode::Destroy),
//!         ),
//!     )
//!     .configure("Post", &json!({}))?
//!     .configure("Comment", &json!({ "column": "removed_at" }))?;
//! let registry = builder.build();
//!
//! assert!(registry.is_paranoid("Post"));
//! assert!(registry.is_paranoid("Comment"));
//! # Ok(())
//! # }
//! ```

use crate::association::Association;
use crate::callbacks::{Callbacks, Hook, HookError, HookPoint, LifecycleObserver};
use crate::config::ParanoidConfiguration;
use crate::error::{ConfigurationError, ParanoidError};
use crate::record::Record;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A record type and the associations it declares.
#[derive(Clone, Debug)]
pub struct ModelDescriptor {
    record_type: String,
    associations: Vec<Association>,
    paranoid: Option<Arc<ParanoidConfiguration>>,
}

impl ModelDescriptor {
    /// A model with no associations.
    #[must_use]
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            associations: Vec::new(),
            paranoid: None,
        }
    }

    /// Declare an association. Declaration order is kept.
    #[must_use]
    pub fn with_association(mut self, association: Association) -> Self {
        self.associations.push(association);
        self
    }

    /// Record type name.
    #[must_use]
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// All associations in declaration order.
    #[must_use]
    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    /// Associations with a dependent mode other than `None`.
    pub fn dependent_associations(&self) -> impl Iterator<Item = &Association> {
        self.associations.iter().filter(|a| a.is_dependent())
    }

    /// Paranoid configuration, if the type was configured.
    #[must_use]
    pub fn paranoid(&self) -> Option<&Arc<ParanoidConfiguration>> {
        self.paranoid.as_ref()
    }
}

/// Mutable builder for a [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    models: HashMap<String, ModelDescriptor>,
    callbacks: Callbacks,
}

impl RegistryBuilder {
    /// Empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Describe a record type.
    ///
    /// Describing a type again appends the new associations to the existing
    /// ones and keeps any paranoid configuration already attached.
    pub fn register(&mut self, model: ModelDescriptor) -> &mut Self {
        self.callbacks.install(model.record_type(), &HookPoint::DESTROY);
        match self.models.get_mut(model.record_type()) {
            Some(existing) => existing.associations.extend(model.associations),
            None => {
                self.models.insert(model.record_type.clone(), model);
            }
        }
        self
    }

    /// Make `record_type` paranoid from a JSON options mapping.
    ///
    /// The options are validated even when the type is already configured;
    /// the first configuration is kept in that case.
    ///
    /// # Errors
    ///
    /// Any [`ConfigurationError`] raised by
    /// [`ParanoidConfiguration::from_options`]. A failed call leaves the
    /// builder unchanged.
    pub fn configure(
        &mut self,
        record_type: &str,
        options: &Value,
    ) -> Result<&mut Self, ConfigurationError> {
        let config = ParanoidConfiguration::from_options(options)?;
        Ok(self.configure_with(record_type, config))
    }

    /// Make `record_type` paranoid with a typed configuration.
    ///
    /// Types that were never described are registered without associations.
    pub fn configure_with(
        &mut self,
        record_type: &str,
        config: ParanoidConfiguration,
    ) -> &mut Self {
        if !self.models.contains_key(record_type) {
            self.register(ModelDescriptor::new(record_type));
        }
        let Some(model) = self.models.get_mut(record_type) else {
            return self;
        };

        if model.paranoid.is_some() {
            tracing::debug!(record_type, "Type already paranoid, keeping first configuration");
            return self;
        }

        tracing::debug!(
            record_type,
            column = config.primary().column(),
            column_type = %config.primary().column_type(),
            secondary = config.secondary().len(),
            "Configured paranoid type"
        );
        model.paranoid = Some(Arc::new(config));
        self.callbacks.install(record_type, &HookPoint::RECOVER);
        self
    }

    /// Register a hook at `point`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::HookNotInstalled`] when `record_type`
    /// has not installed `point`: unknown types, and recover points on types
    /// that are not paranoid.
    pub fn hook<F>(
        &mut self,
        record_type: &str,
        point: HookPoint,
        hook: F,
    ) -> Result<&mut Self, ConfigurationError>
    where
        F: Fn(&Record) -> Result<(), HookError> + Send + Sync + 'static,
    {
        if !self.callbacks.is_installed(record_type, point) {
            return Err(ConfigurationError::HookNotInstalled {
                record_type: record_type.to_string(),
                point,
            });
        }
        let hook: Hook = Arc::new(hook);
        self.callbacks.add_hook(record_type, point, hook);
        Ok(self)
    }

    /// Register a `before_destroy` hook.
    ///
    /// # Errors
    ///
    /// See [`hook`](Self::hook).
    pub fn before_destroy<F>(
        &mut self,
        record_type: &str,
        hook: F,
    ) -> Result<&mut Self, ConfigurationError>
    where
        F: Fn(&Record) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hook(record_type, HookPoint::BeforeDestroy, hook)
    }

    /// Register an `after_destroy` hook.
    ///
    /// # Errors
    ///
    /// See [`hook`](Self::hook).
    pub fn after_destroy<F>(
        &mut self,
        record_type: &str,
        hook: F,
    ) -> Result<&mut Self, ConfigurationError>
    where
        F: Fn(&Record) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hook(record_type, HookPoint::AfterDestroy, hook)
    }

    /// Register an `after_destroy_commit` hook. Its failures are logged, not
    /// propagated.
    ///
    /// # Errors
    ///
    /// See [`hook`](Self::hook).
    pub fn after_destroy_commit<F>(
        &mut self,
        record_type: &str,
        hook: F,
    ) -> Result<&mut Self, ConfigurationError>
    where
        F: Fn(&Record) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hook(record_type, HookPoint::AfterDestroyCommit, hook)
    }

    /// Register a `before_recover` hook.
    ///
    /// # Errors
    ///
    /// See [`hook`](Self::hook).
    pub fn before_recover<F>(
        &mut self,
        record_type: &str,
        hook: F,
    ) -> Result<&mut Self, ConfigurationError>
    where
        F: Fn(&Record) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hook(record_type, HookPoint::BeforeRecover, hook)
    }

    /// Register an `after_recover` hook.
    ///
    /// # Errors
    ///
    /// See [`hook`](Self::hook).
    pub fn after_recover<F>(
        &mut self,
        record_type: &str,
        hook: F,
    ) -> Result<&mut Self, ConfigurationError>
    where
        F: Fn(&Record) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hook(record_type, HookPoint::AfterRecover, hook)
    }

    /// Subscribe an observer to every event of `record_type`.
    pub fn observe(
        &mut self,
        record_type: &str,
        observer: Arc<dyn LifecycleObserver>,
    ) -> &mut Self {
        self.callbacks.add_observer(record_type, observer);
        self
    }

    /// Freeze the builder into a registry.
    #[must_use]
    pub fn build(self) -> Registry {
        tracing::info!(
            models = self.models.len(),
            paranoid = self.models.values().filter(|m| m.paranoid.is_some()).count(),
            "Built record type registry"
        );
        Registry {
            models: self.models,
            callbacks: self.callbacks,
        }
    }
}

/// Immutable table of record types.
#[derive(Debug)]
pub struct Registry {
    models: HashMap<String, ModelDescriptor>,
    callbacks: Callbacks,
}

impl Registry {
    /// Start a new builder.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Descriptor of `record_type`.
    #[must_use]
    pub fn model(&self, record_type: &str) -> Option<&ModelDescriptor> {
        self.models.get(record_type)
    }

    /// Paranoid configuration of `record_type`, if any.
    #[must_use]
    pub fn paranoid_config(&self, record_type: &str) -> Option<&Arc<ParanoidConfiguration>> {
        self.models.get(record_type).and_then(ModelDescriptor::paranoid)
    }

    /// Whether `record_type` is configured for soft deletion.
    #[must_use]
    pub fn is_paranoid(&self, record_type: &str) -> bool {
        self.paranoid_config(record_type).is_some()
    }

    /// Registered callbacks.
    #[must_use]
    pub const fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    /// A new record of `record_type` with every marker at its non-deleted value.
    ///
    /// # Errors
    ///
    /// Returns [`ParanoidError::UnknownRecordType`] for undescribed types.
    pub fn new_record(&self, record_type: &str) -> Result<Record, ParanoidError> {
        let model = self
            .model(record_type)
            .ok_or_else(|| ParanoidError::UnknownRecordType(record_type.to_string()))?;
        let mut record = Record::new(record_type);
        if let Some(config) = model.paranoid() {
            config.initialize(&mut record);
        }
        Ok(record)
    }
}

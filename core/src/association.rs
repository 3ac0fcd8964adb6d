//! Association metadata.
//!
//! The host declares associations once at registration. The cascade resolver
//! only follows associations whose [`DependentMode`] is not `None`.

use serde::{Deserialize, Serialize};

/// Shape of an association.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    /// Many target rows reference the owner through `foreign_key`.
    HasMany,
    /// One target row references the owner through `foreign_key`.
    HasOne,
    /// The owner references one target row through its own `foreign_key`.
    BelongsTo,
}

/// What happens to associated rows when the owner goes away.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependentMode {
    /// Targets are destroyed through their own lifecycle.
    Destroy,
    /// Targets are removed in bulk without callbacks.
    DeleteAll,
    /// Targets are left alone.
    #[default]
    None,
}

/// A declared association between two record types.
///
/// # Examples
///
/// ```
/// use paranoia_core::association::{Association, AssociationKind, DependentMode};
///
/// let comments = Association::has_many("comments", "Comment", "post_id")
///     .dependent(DependentMode::Destroy);
/// assert_eq!(comments.kind(), AssociationKind::HasMany);
/// assert!(comments.is_dependent());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    name: String,
    kind: AssociationKind,
    dependent: DependentMode,
    target: String,
    foreign_key: String,
}

impl Association {
    fn new(
        name: impl Into<String>,
        kind: AssociationKind,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            dependent: DependentMode::None,
            target: target.into(),
            foreign_key: foreign_key.into(),
        }
    }

    /// `foreign_key` lives on `target` and points at the owner.
    #[must_use]
    pub fn has_many(
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(name, AssociationKind::HasMany, target, foreign_key)
    }

    /// `foreign_key` lives on `target` and points at the owner.
    #[must_use]
    pub fn has_one(
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(name, AssociationKind::HasOne, target, foreign_key)
    }

    /// `foreign_key` lives on the owner and points at `target`.
    #[must_use]
    pub fn belongs_to(
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(name, AssociationKind::BelongsTo, target, foreign_key)
    }

    /// Set the dependent mode.
    #[must_use]
    pub fn dependent(mut self, mode: DependentMode) -> Self {
        self.dependent = mode;
        self
    }

    /// Association name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Association shape.
    #[must_use]
    pub const fn kind(&self) -> AssociationKind {
        self.kind
    }

    /// Dependent mode.
    #[must_use]
    pub const fn dependent_mode(&self) -> DependentMode {
        self.dependent
    }

    /// Target record type.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Foreign key column.
    #[must_use]
    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    /// `true` unless the dependent mode is `None`.
    #[must_use]
    pub fn is_dependent(&self) -> bool {
        self.dependent != DependentMode::None
    }
}

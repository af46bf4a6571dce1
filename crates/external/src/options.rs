//! Configuration of an [`ExternalCodec`](crate::ExternalCodec).

use std::{fmt, sync::Arc};

use quill_serialize::TypeInfo;

/// The answer of an eligibility override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Eligibility {
    /// The type is handled, whatever its compatibility marker says.
    Allow,

    /// The type is not handled, whatever its compatibility marker says.
    Deny,

    /// No opinion; fall back to the compatibility marker.
    #[default]
    Unspecified,
}

impl Eligibility {
    /// The definite answer, if there is one.
    #[must_use]
    pub const fn decision(self) -> Option<bool> {
        match self {
            Self::Allow => Some(true),
            Self::Deny => Some(false),
            Self::Unspecified => None,
        }
    }
}

impl From<Option<bool>> for Eligibility {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Allow,
            Some(false) => Self::Deny,
            None => Self::Unspecified,
        }
    }
}

/// What a type is being checked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    /// Writing to and reading from the wire.
    Encode,

    /// Deep copying in process.
    Clone,
}

/// A caller-supplied eligibility rule.
pub type EligibilityOverride =
    Arc<dyn Fn(&TypeInfo) -> Eligibility + Send + Sync>;

/// Options of an [`ExternalCodec`](crate::ExternalCodec).
///
/// The two overrides are independent: a type may be allowed for one
/// purpose and denied for the other. Override answers are never cached.
pub struct ExternalCodecOptions<O> {
    /// Settings forwarded to the external serializer.
    pub serializer_options: O,

    /// Decides [`Purpose::Encode`] eligibility ahead of the compatibility
    /// marker.
    pub is_serializable_type: Option<EligibilityOverride>,

    /// Decides [`Purpose::Clone`] eligibility ahead of the compatibility
    /// marker.
    pub is_copyable_type: Option<EligibilityOverride>,
}

impl<O> ExternalCodecOptions<O> {
    /// Creates options without overrides.
    pub const fn new(serializer_options: O) -> Self {
        Self {
            serializer_options,
            is_serializable_type: None,
            is_copyable_type: None,
        }
    }

    /// Sets the [`Purpose::Encode`] override.
    #[must_use]
    pub fn with_serializable_override(
        mut self,
        rule: impl Fn(&TypeInfo) -> Eligibility + Send + Sync + 'static,
    ) -> Self {
        self.is_serializable_type = Some(Arc::new(rule));
        self
    }

    /// Sets the [`Purpose::Clone`] override.
    #[must_use]
    pub fn with_copyable_override(
        mut self,
        rule: impl Fn(&TypeInfo) -> Eligibility + Send + Sync + 'static,
    ) -> Self {
        self.is_copyable_type = Some(Arc::new(rule));
        self
    }

    /// Runs the override configured for `purpose`.
    #[must_use]
    pub fn override_for(&self, ty: &TypeInfo, purpose: Purpose) -> Eligibility {
        let rule = match purpose {
            Purpose::Encode => self.is_serializable_type.as_ref(),
            Purpose::Clone => self.is_copyable_type.as_ref(),
        };

        rule.map_or(Eligibility::Unspecified, |rule| rule(ty))
    }
}

impl<O: Default> Default for ExternalCodecOptions<O> {
    fn default() -> Self { Self::new(O::default()) }
}

impl<O: Clone> Clone for ExternalCodecOptions<O> {
    fn clone(&self) -> Self {
        Self {
            serializer_options: self.serializer_options.clone(),
            is_serializable_type: self.is_serializable_type.clone(),
            is_copyable_type: self.is_copyable_type.clone(),
        }
    }
}

impl<O: fmt::Debug> fmt::Debug for ExternalCodecOptions<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalCodecOptions")
            .field("serializer_options", &self.serializer_options)
            .field("is_serializable_type", &self.is_serializable_type.is_some())
            .field("is_copyable_type", &self.is_copyable_type.is_some())
            .finish()
    }
}
